//! JSON-file-backed ledger for the administrative CLI
//!
//! A single-writer store used by `tessera <component> initialize` so the
//! seeded key material lands somewhere durable. Values are kept base64 in
//! the file to stay printable. This backend has no transactions or
//! concurrency control and is not part of the replicated execution model;
//! the timestamp and id it reports are fixed at open time by the caller.

use crate::state::{LedgerError, LedgerState};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tessera_core::TxTimestamp;

/// File-backed [`LedgerState`] for administrative commands
pub struct FileLedger {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    timestamp: TxTimestamp,
    tx_id: String,
}

impl FileLedger {
    /// Open or create the ledger file
    ///
    /// `timestamp` and `tx_id` identify the administrative action; they are
    /// captured once by the caller, not read per operation.
    pub fn open(
        path: impl AsRef<Path>,
        timestamp: TxTimestamp,
        tx_id: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| LedgerError::Io(format!("read {}: {e}", path.display())))?;
            let encoded: BTreeMap<String, String> = serde_json::from_str(&raw)
                .map_err(|e| LedgerError::Corrupt(format!("{}: {e}", path.display())))?;
            let mut decoded = BTreeMap::new();
            for (key, value) in encoded {
                let bytes = BASE64
                    .decode(&value)
                    .map_err(|e| LedgerError::Corrupt(format!("{key}: {e}")))?;
                decoded.insert(key, bytes);
            }
            decoded
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            timestamp,
            tx_id: tx_id.into(),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), LedgerError> {
        let encoded: BTreeMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.clone(), BASE64.encode(v)))
            .collect();
        let raw = serde_json::to_string_pretty(&encoded)
            .map_err(|e| LedgerError::Io(e.to_string()))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| LedgerError::Io(format!("write {}: {e}", self.path.display())))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LedgerState for FileLedger {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    async fn delete(&self, key: &str) -> Result<(), LedgerError> {
        let mut entries = self.lock();
        entries.remove(key);
        self.persist(&entries)
    }

    async fn range_scan(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        let range = (
            std::ops::Bound::Included(start.to_string()),
            std::ops::Bound::Excluded(end.to_string()),
        );
        Ok(self
            .lock()
            .range(range)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn tx_timestamp(&self) -> TxTimestamp {
        self.timestamp
    }

    fn tx_id(&self) -> &str {
        &self.tx_id
    }
}
