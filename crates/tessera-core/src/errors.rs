//! Unified error type for all Tessera operations
//!
//! Every operation either returns its success payload or one of these typed
//! errors. The `kind()` strings are part of the public contract and stay
//! stable across versions; messages are informational only and never carry
//! secret material (private keys, session keys, decrypted plaintexts).

use serde::{Deserialize, Serialize};

/// Unified error type for all Tessera operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TesseraError {
    /// A referenced record does not exist
    #[error("not found: {message}")]
    NotFound {
        /// What was looked up and missed
        message: String,
    },

    /// A record with the same identity already exists
    #[error("already exists: {message}")]
    AlreadyExists {
        /// Which record collided
        message: String,
    },

    /// Malformed or out-of-contract input
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// A supplied PEM document could not be accepted
    #[error("invalid PEM: {message}")]
    InvalidPem {
        /// Why the PEM was rejected
        message: String,
    },

    /// Asymmetric or symmetric decryption failed
    #[error("decrypt failed: {message}")]
    CryptoDecryptFailed {
        /// Which envelope failed to open
        message: String,
    },

    /// A signature did not verify under the expected public key
    #[error("signature invalid: {message}")]
    SignatureInvalid {
        /// Which verification failed
        message: String,
    },

    /// A challenge, ticket, or authenticator is past its lifetime
    #[error("expired: {message}")]
    Expired {
        /// What expired and when
        message: String,
    },

    /// Two fields that must agree do not
    #[error("mismatch: {message}")]
    Mismatch {
        /// Which fields disagreed
        message: String,
    },

    /// A one-time credential was presented again
    #[error("replay: {message}")]
    Replay {
        /// Which credential was replayed
        message: String,
    },

    /// The transaction's read set was invalidated by a concurrent commit
    #[error("conflict: {message}")]
    Conflict {
        /// Which commit conflicted
        message: String,
    },

    /// The principal is known but not allowed to perform the operation
    #[error("not authorized: {message}")]
    NotAuthorized {
        /// Why authorization failed
        message: String,
    },

    /// Invariant violation or infrastructure failure
    #[error("internal: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl TesseraError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an already exists error
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid PEM error
    pub fn invalid_pem(message: impl Into<String>) -> Self {
        Self::InvalidPem {
            message: message.into(),
        }
    }

    /// Create a decrypt failed error
    pub fn decrypt_failed(message: impl Into<String>) -> Self {
        Self::CryptoDecryptFailed {
            message: message.into(),
        }
    }

    /// Create a signature invalid error
    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            message: message.into(),
        }
    }

    /// Create an expired error
    pub fn expired(message: impl Into<String>) -> Self {
        Self::Expired {
            message: message.into(),
        }
    }

    /// Create a mismatch error
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::Mismatch {
            message: message.into(),
        }
    }

    /// Create a replay error
    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a not authorized error
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::NotAuthorized {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error kind string surfaced to callers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidInput { .. } => "invalid_input",
            Self::InvalidPem { .. } => "invalid_pem",
            Self::CryptoDecryptFailed { .. } => "crypto_decrypt_failed",
            Self::SignatureInvalid { .. } => "signature_invalid",
            Self::Expired { .. } => "expired",
            Self::Mismatch { .. } => "mismatch",
            Self::Replay { .. } => "replay",
            Self::Conflict { .. } => "conflict",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether a caller should retry the operation with fresh reads
    ///
    /// Only commit-time conflicts are retryable; every other error is a
    /// definitive answer for the submitted inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Standard Result type for Tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;

impl From<serde_json::Error> for TesseraError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON codec: {err}"))
    }
}

impl From<base64::DecodeError> for TesseraError {
    fn from(err: base64::DecodeError) -> Self {
        Self::invalid_input(format!("base64: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TesseraError::not_found("CLIENT_c1");
        assert!(matches!(err, TesseraError::NotFound { .. }));
        assert_eq!(err.to_string(), "not found: CLIENT_c1");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(TesseraError::conflict("read set stale").is_retryable());
        assert!(!TesseraError::expired("challenge").is_retryable());
        assert!(!TesseraError::replay("authenticator").is_retryable());
    }

    #[test]
    fn test_kind_strings_are_stable() {
        let kinds: Vec<&str> = [
            TesseraError::not_found(""),
            TesseraError::already_exists(""),
            TesseraError::invalid_input(""),
            TesseraError::invalid_pem(""),
            TesseraError::decrypt_failed(""),
            TesseraError::signature_invalid(""),
            TesseraError::expired(""),
            TesseraError::mismatch(""),
            TesseraError::replay(""),
            TesseraError::conflict(""),
            TesseraError::not_authorized(""),
            TesseraError::internal(""),
        ]
        .iter()
        .map(TesseraError::kind)
        .collect();
        assert_eq!(
            kinds,
            vec![
                "not_found",
                "already_exists",
                "invalid_input",
                "invalid_pem",
                "crypto_decrypt_failed",
                "signature_invalid",
                "expired",
                "mismatch",
                "replay",
                "conflict",
                "not_authorized",
                "internal",
            ]
        );
    }
}
