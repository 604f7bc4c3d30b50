//! Key material access for the AS
//!
//! The AS owns `AS_PRIVATE_KEY`/`AS_PUBLIC_KEY` and reads the TGS public
//! key and registered client public keys from the shared registry. All
//! registry keys are written once and read-only afterwards.

use rsa::{RsaPrivateKey, RsaPublicKey};
use tessera_core::{state_keys, ClientId, Result, TesseraError};
use tessera_crypto::pem;
use tessera_ledger::LedgerState;

/// Load the AS private key, failing if the component was never initialized
pub async fn private_key(ledger: &dyn LedgerState) -> Result<RsaPrivateKey> {
    let bytes = ledger
        .get(state_keys::AS_PRIVATE_KEY)
        .await?
        .ok_or_else(|| TesseraError::internal("authentication server is not initialized"))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| TesseraError::internal("stored AS private key is not UTF-8"))?;
    Ok(pem::parse_private_key(&text)?)
}

/// Load the TGS public key published at TGS initialization
pub async fn tgs_public_key(ledger: &dyn LedgerState) -> Result<RsaPublicKey> {
    let bytes = ledger.get(state_keys::TGS_PUBLIC_KEY).await?.ok_or_else(|| {
        TesseraError::internal("ticket-granting server has not published its public key")
    })?;
    let text = String::from_utf8(bytes)
        .map_err(|_| TesseraError::internal("stored TGS public key is not UTF-8"))?;
    Ok(pem::parse_public_key(&text)?)
}

/// Load a registered client's public key from `CLIENT_PK_<id>`
pub async fn client_public_key(ledger: &dyn LedgerState, id: &ClientId) -> Result<RsaPublicKey> {
    let key = state_keys::client_pk(id);
    let bytes = ledger
        .get(&key)
        .await?
        .ok_or_else(|| TesseraError::not_found(key.clone()))?;
    let text =
        String::from_utf8(bytes).map_err(|_| TesseraError::internal(format!("{key} not UTF-8")))?;
    Ok(pem::parse_public_key(&text)?)
}
