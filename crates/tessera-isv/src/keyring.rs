//! Key material access for the ISV
//!
//! The ISV owns `ISV_PRIVATE_KEY`/`ISV_PUBLIC_KEY`; device public keys
//! live inside the device records it writes at registration.

use rsa::RsaPrivateKey;
use tessera_core::{state_keys, Result, TesseraError};
use tessera_crypto::pem;
use tessera_ledger::LedgerState;

/// Load the ISV private key, failing if the component was never initialized
pub async fn private_key(ledger: &dyn LedgerState) -> Result<RsaPrivateKey> {
    let bytes = ledger
        .get(state_keys::ISV_PRIVATE_KEY)
        .await?
        .ok_or_else(|| TesseraError::internal("service validator is not initialized"))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| TesseraError::internal("stored ISV private key is not UTF-8"))?;
    Ok(pem::parse_private_key(&text)?)
}
