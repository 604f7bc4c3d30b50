//! # Tessera Authentication Server
//!
//! First hop of the ticket flow. The AS registers client principals with
//! their RSA public keys, issues nonce challenges, verifies possession of
//! the matching private key, and mints Ticket-Granting Tickets encrypted
//! for the TGS with the client-TGS session key wrapped under the client's
//! public key.
//!
//! Per-client state machine:
//!
//! ```text
//! Unregistered --RegisterClient--> Registered
//! Registered --InitiateAuthentication--> ChallengeOutstanding
//! ChallengeOutstanding --Verify* ok--> Registered   (challenge consumed)
//! ChallengeOutstanding --expiry--> Registered       (challenge reaped lazily)
//! ```
//!
//! TGT issuance requires `Registered` (a valid identity) and does not move
//! the machine; a client may hold any number of live TGTs bounded by their
//! lifetimes.

#![forbid(unsafe_code)]

mod keyring;
mod records;
mod server;

pub use records::{AuthChallenge, ClientAuthState, ClientIdentity};
pub use server::{AuthServer, AuthServerConfig};
