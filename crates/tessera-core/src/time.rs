//! Deterministic transaction time
//!
//! Every replica of one logical operation observes the same transaction
//! timestamp, supplied by the ordering layer. Wall-clock reads are forbidden
//! anywhere time enters persisted state or tickets; the only source of time
//! inside a transaction is [`TxTimestamp`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The transaction's ordering timestamp
///
/// Monotonic across committed transactions for a given client. Seconds and
/// nanos are carried separately the way the ordering layer reports them;
/// persisted records and derivations use whole seconds only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TxTimestamp {
    /// Whole seconds since the Unix epoch
    pub secs: u64,
    /// Sub-second component
    pub nanos: u32,
}

impl TxTimestamp {
    /// Build a timestamp from whole seconds
    pub fn from_secs(secs: u64) -> Self {
        Self { secs, nanos: 0 }
    }

    /// Unix seconds, the granularity used by tickets and audit keys
    pub fn unix_secs(&self) -> u64 {
        self.secs
    }

    /// The minute bucket used by signed device status updates
    pub fn minute_bucket(&self) -> u64 {
        self.secs / 60
    }

    /// Whether a deadline expressed in unix seconds has passed
    pub fn is_after(&self, deadline_secs: u64) -> bool {
        self.secs > deadline_secs
    }
}

impl fmt::Display for TxTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}
