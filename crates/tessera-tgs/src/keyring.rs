//! Key material access for the TGS
//!
//! The TGS owns `TGS_PRIVATE_KEY`/`TGS_PUBLIC_KEY` and reads the ISV
//! public key from the shared registry to encrypt service tickets for the
//! next hop.

use rsa::{RsaPrivateKey, RsaPublicKey};
use tessera_core::{state_keys, Result, TesseraError};
use tessera_crypto::pem;
use tessera_ledger::LedgerState;

/// Load the TGS private key, failing if the component was never initialized
pub async fn private_key(ledger: &dyn LedgerState) -> Result<RsaPrivateKey> {
    let bytes = ledger
        .get(state_keys::TGS_PRIVATE_KEY)
        .await?
        .ok_or_else(|| TesseraError::internal("ticket-granting server is not initialized"))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| TesseraError::internal("stored TGS private key is not UTF-8"))?;
    Ok(pem::parse_private_key(&text)?)
}

/// Load the ISV public key published at ISV initialization
pub async fn isv_public_key(ledger: &dyn LedgerState) -> Result<RsaPublicKey> {
    let bytes = ledger.get(state_keys::ISV_PUBLIC_KEY).await?.ok_or_else(|| {
        TesseraError::internal("service validator has not published its public key")
    })?;
    let text = String::from_utf8(bytes)
        .map_err(|_| TesseraError::internal("stored ISV public key is not UTF-8"))?;
    Ok(pem::parse_public_key(&text)?)
}
