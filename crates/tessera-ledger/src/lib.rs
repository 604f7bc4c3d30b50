//! # Tessera Ledger
//!
//! The abstract replicated state store the three ticket servers execute
//! against, and two concrete backends:
//!
//! - [`MemoryLedger`]: deterministic in-memory store with snapshot-isolated
//!   transactions, staged write sets, and commit-time read-set validation.
//!   This mirrors the execution model of the replicated store: optimistic
//!   concurrency with conflicts surfaced as errors, never locks. It is also
//!   the backend every test runs against.
//! - [`FileLedger`]: JSON-file-backed single-writer store for the
//!   administrative CLI. No concurrency control; not a replicated ledger.
//!
//! Components never see a backend type: every operation takes
//! `&dyn LedgerState`, which for the replicated model is one transaction.
//! Partial writes never become visible: a transaction either commits its
//! whole write set or nothing.

#![forbid(unsafe_code)]

pub mod codec;
mod file;
mod memory;
mod state;

pub use file::FileLedger;
pub use memory::{LedgerTransaction, MemoryLedger};
pub use state::{LedgerError, LedgerState};
