//! Deterministic in-memory ledger with optimistic concurrency
//!
//! The committed state is a `BTreeMap` so every iteration the backend ever
//! performs is in key order; no operation may depend on hash-map iteration
//! order. Each committed write records the commit sequence number that
//! produced it; a transaction validates at commit time that nothing it read
//! (point reads and scanned ranges alike) was overwritten by a later
//! commit, and fails with [`LedgerError::Conflict`] otherwise.

use crate::state::{LedgerError, LedgerState};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tessera_core::TxTimestamp;

#[derive(Default)]
struct Committed {
    entries: BTreeMap<String, Vec<u8>>,
    /// Commit sequence number of the last write (put or delete) per key.
    /// Tombstones are retained so a delete also invalidates readers.
    versions: BTreeMap<String, u64>,
    commit_seq: u64,
}

/// Shared in-memory ledger; clone handles freely
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<Committed>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a transaction at the given ordering timestamp
    ///
    /// The timestamp and id come from the ordering layer; in tests they are
    /// scripted. Transactions taken from the same ledger see a snapshot as
    /// of this call.
    pub fn begin(&self, timestamp: TxTimestamp, tx_id: impl Into<String>) -> LedgerTransaction {
        let committed = read_lock(&self.inner);
        LedgerTransaction {
            store: Arc::clone(&self.inner),
            snapshot: committed.entries.clone(),
            snapshot_seq: committed.commit_seq,
            timestamp,
            tx_id: tx_id.into(),
            stage: Mutex::new(Some(TxStage::default())),
        }
    }

    /// Committed state as ordered key-value pairs (for tests and audits)
    pub fn dump(&self) -> Vec<(String, Vec<u8>)> {
        read_lock(&self.inner)
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Point-read committed state without a transaction (for tests)
    pub fn get_committed(&self, key: &str) -> Option<Vec<u8>> {
        read_lock(&self.inner).entries.get(key).cloned()
    }
}

#[derive(Default)]
struct TxStage {
    /// Staged writes; `None` is a staged deletion
    writes: BTreeMap<String, Option<Vec<u8>>>,
    /// Keys observed by point reads
    reads: Vec<String>,
    /// Ranges observed by scans
    ranges: Vec<(String, String)>,
}

/// A snapshot-isolated transaction over a [`MemoryLedger`]
///
/// Implements [`LedgerState`]; reads see the snapshot plus the
/// transaction's own staged writes. Dropping without [`commit`] discards
/// everything.
///
/// [`commit`]: LedgerTransaction::commit
pub struct LedgerTransaction {
    store: Arc<RwLock<Committed>>,
    snapshot: BTreeMap<String, Vec<u8>>,
    snapshot_seq: u64,
    timestamp: TxTimestamp,
    tx_id: String,
    stage: Mutex<Option<TxStage>>,
}

impl LedgerTransaction {
    fn with_stage<R>(
        &self,
        f: impl FnOnce(&mut TxStage) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let mut guard = match self.stage.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_mut() {
            Some(stage) => f(stage),
            None => Err(LedgerError::Closed),
        }
    }

    /// Validate the read set and publish the write set
    ///
    /// Fails with [`LedgerError::Conflict`] if any key this transaction read
    /// (directly or through a range scan) was written by a commit after
    /// this transaction's snapshot. On success all staged writes become
    /// visible atomically.
    pub fn commit(self) -> Result<(), LedgerError> {
        let stage = {
            let mut guard = match self.stage.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take().ok_or(LedgerError::Closed)?
        };

        let mut committed = write_lock(&self.store);

        for key in &stage.reads {
            if committed.versions.get(key).copied().unwrap_or(0) > self.snapshot_seq {
                return Err(LedgerError::Conflict { key: key.clone() });
            }
        }
        for (start, end) in &stage.ranges {
            let range = (
                std::ops::Bound::Included(start.clone()),
                std::ops::Bound::Excluded(end.clone()),
            );
            for (key, version) in committed.versions.range(range) {
                if *version > self.snapshot_seq {
                    return Err(LedgerError::Conflict { key: key.clone() });
                }
            }
        }

        committed.commit_seq += 1;
        let seq = committed.commit_seq;
        for (key, value) in stage.writes {
            committed.versions.insert(key.clone(), seq);
            match value {
                Some(bytes) => {
                    committed.entries.insert(key, bytes);
                }
                None => {
                    committed.entries.remove(&key);
                }
            }
        }
        tracing::debug!(tx_id = %self.tx_id, seq, "transaction committed");
        Ok(())
    }
}

#[async_trait]
impl LedgerState for LedgerTransaction {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.with_stage(|stage| {
            if let Some(staged) = stage.writes.get(key) {
                return Ok(staged.clone());
            }
            stage.reads.push(key.to_string());
            Ok(self.snapshot.get(key).cloned())
        })
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.with_stage(|stage| {
            stage.writes.insert(key.to_string(), Some(value));
            Ok(())
        })
    }

    async fn delete(&self, key: &str) -> Result<(), LedgerError> {
        self.with_stage(|stage| {
            stage.writes.insert(key.to_string(), None);
            Ok(())
        })
    }

    async fn range_scan(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        self.with_stage(|stage| {
            stage.ranges.push((start.to_string(), end.to_string()));
            let range = (
                std::ops::Bound::Included(start.to_string()),
                std::ops::Bound::Excluded(end.to_string()),
            );
            // Overlay staged writes on the snapshot so a transaction scans
            // its own effects.
            let mut merged: BTreeMap<String, Vec<u8>> = self
                .snapshot
                .range(range.clone())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (key, value) in stage.writes.range(range) {
                match value {
                    Some(bytes) => {
                        merged.insert(key.clone(), bytes.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
            Ok(merged.into_iter().collect())
        })
    }

    fn tx_timestamp(&self) -> TxTimestamp {
        self.timestamp
    }

    fn tx_id(&self) -> &str {
        &self.tx_id
    }
}
