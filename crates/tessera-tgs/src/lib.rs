//! # Tessera Ticket-Granting Server
//!
//! Second hop of the ticket flow. The TGS decrypts TGTs minted by the AS,
//! records client registrations, verifies per-request authenticators with
//! one-time replay suppression, and mints Service Tickets encrypted for
//! the ISV. The new client-service session key returns to the client
//! wrapped under the TGT session key the client already holds; the TGS
//! never sees a client public key and there is no fallback path.

#![forbid(unsafe_code)]

mod keyring;
mod records;
mod server;

pub use records::{ClientRecord, RegistrationStatus};
pub use server::{TicketGrantingServer, TicketGrantingServerConfig};
