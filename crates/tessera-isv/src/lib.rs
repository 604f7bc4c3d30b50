//! # Tessera IoT Service Validator
//!
//! Final hop of the ticket flow. The ISV keeps the IoT device registry,
//! validates Service Tickets minted by the TGS, and mediates bounded
//! client-device sessions: a granted request creates an `active` session,
//! marks the device `busy`, and hands the client a payload sealed under
//! the service session key; closing the session returns the device to
//! `active`.
//!
//! Session lifecycle:
//!
//! ```text
//! None --ProcessServiceRequest--> Active --CloseSession--> Terminated
//!                                 Active --expiresAt passed--> Terminated (lazy)
//! ```
//!
//! Expiry is observed lazily: any operation touching a session whose
//! `expiresAt` has passed treats it as terminated and restores the device
//! before returning.

#![forbid(unsafe_code)]

mod keyring;
mod records;
mod server;

pub use records::{ClientDeviceSession, DeviceStatus, IoTDevice, SessionStatus};
pub use server::{ResponseRecord, ServiceValidator, ServiceValidatorConfig};
