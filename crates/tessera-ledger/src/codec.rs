//! Typed JSON records over the raw byte store
//!
//! All persisted entities are UTF-8 JSON. Decode failures on read mean the
//! namespace holds something a different writer produced, surfaced as an
//! internal error, never silently skipped at the point-read level.

use crate::state::LedgerState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_core::{Result, TesseraError};

/// Read and decode a JSON record, `None` if the key is absent
pub async fn get_json<T: DeserializeOwned>(
    state: &dyn LedgerState,
    key: &str,
) -> Result<Option<T>> {
    match state.get(key).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| TesseraError::internal(format!("corrupt record at {key}: {e}")))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encode and stage a JSON record
pub async fn put_json<T: Serialize>(state: &dyn LedgerState, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    state.put(key, bytes).await?;
    Ok(())
}

/// Read and decode a JSON record that must exist
pub async fn require_json<T: DeserializeOwned>(state: &dyn LedgerState, key: &str) -> Result<T> {
    get_json(state, key)
        .await?
        .ok_or_else(|| TesseraError::not_found(key.to_string()))
}
