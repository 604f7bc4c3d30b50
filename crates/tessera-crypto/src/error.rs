//! Crypto error sub-kinds
//!
//! Helpers in this crate fail with one of five sub-kinds. They convert into
//! the platform error type losslessly; messages never include key material
//! or recovered plaintext.

use tessera_core::TesseraError;

/// Failure modes of the crypto helpers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// A PEM document could not be parsed as an RSA key
    #[error("invalid PEM: {0}")]
    InvalidPem(String),
    /// A key parsed but is not acceptable (wrong algorithm or undersized)
    #[error("wrong key type: {0}")]
    WrongKeyType(String),
    /// An RSA or AEAD decryption failed
    #[error("decrypt failed: {0}")]
    DecryptFailed(String),
    /// A signature did not verify
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
    /// Base64 or plaintext-size constraints were violated
    #[error("encoding invalid: {0}")]
    EncodingInvalid(String),
}

impl From<CryptoError> for TesseraError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPem(m) => TesseraError::invalid_pem(m),
            CryptoError::WrongKeyType(m) => TesseraError::invalid_pem(m),
            CryptoError::DecryptFailed(m) => TesseraError::decrypt_failed(m),
            CryptoError::SignatureInvalid(m) => TesseraError::signature_invalid(m),
            CryptoError::EncodingInvalid(m) => TesseraError::invalid_input(m),
        }
    }
}
