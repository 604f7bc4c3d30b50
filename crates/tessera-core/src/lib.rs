//! # Tessera Core
//!
//! Foundation types shared by the three Tessera ticket servers:
//!
//! - [`errors`]: the unified [`TesseraError`] type with the stable error
//!   kind taxonomy surfaced to callers
//! - [`identifiers`]: validated principal identifiers (`ClientId`,
//!   `DeviceId`, `ServiceId`) and derived `SessionId`s
//! - [`time`]: the deterministic transaction timestamp
//! - [`state_keys`]: the bit-exact ledger key namespace
//! - [`ticket`]: the time-bounded credential carried between hops and the
//!   audit record written alongside every state-changing operation
//! - [`wire`]: JSON payloads exchanged with clients
//!
//! This crate holds no cryptography and performs no I/O; it is the bottom
//! layer every other Tessera crate builds on.

#![forbid(unsafe_code)]

pub mod errors;
pub mod identifiers;
pub mod state_keys;
pub mod ticket;
pub mod time;
pub mod wire;

pub use errors::{Result, TesseraError};
pub use identifiers::{ClientId, DeviceId, ServiceId, SessionId};
pub use ticket::{AuditRecord, Ticket};
pub use time::TxTimestamp;
