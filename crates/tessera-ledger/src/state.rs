//! The state-store contract
//!
//! Each ticket-server operation executes as a single deterministic
//! transaction against this interface. The only suspension points inside a
//! transaction are these reads and writes; crypto is synchronous and
//! wall-clock reads are forbidden; time enters exclusively through
//! [`LedgerState::tx_timestamp`].

use async_trait::async_trait;
use tessera_core::{TesseraError, TxTimestamp};

/// Ledger operation errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Backend I/O failure
    #[error("ledger io: {0}")]
    Io(String),
    /// Stored bytes could not be interpreted
    #[error("ledger corrupt: {0}")]
    Corrupt(String),
    /// The transaction's read set was invalidated before commit
    #[error("ledger conflict on {key}")]
    Conflict {
        /// First key observed stale
        key: String,
    },
    /// The transaction was already committed or abandoned
    #[error("transaction closed")]
    Closed,
}

impl From<LedgerError> for TesseraError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict { key } => {
                TesseraError::conflict(format!("read set stale at {key}"))
            }
            other => TesseraError::internal(other.to_string()),
        }
    }
}

/// One transaction's view of the replicated key-value state
///
/// Reads come from a consistent snapshot; writes are staged and become
/// visible only on commit. `range_scan` returns entries in lexicographic
/// key order over the half-open interval `[start, end)`; deterministic by
/// contract, so callers may fold over it inside a transaction.
#[async_trait]
pub trait LedgerState: Send + Sync {
    /// Read a key, or `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Stage a write
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Stage a deletion
    async fn delete(&self, key: &str) -> Result<(), LedgerError>;

    /// Scan `[start, end)` in lexicographic order
    async fn range_scan(&self, start: &str, end: &str)
        -> Result<Vec<(String, Vec<u8>)>, LedgerError>;

    /// The transaction's deterministic ordering timestamp
    fn tx_timestamp(&self) -> TxTimestamp;

    /// Opaque transaction id, used only for audit bodies and one-time
    /// suppression records
    fn tx_id(&self) -> &str;
}
