//! Deterministic derivations
//!
//! State updates must be byte-identical across every replica of one logical
//! operation, so nothing here touches an entropy pool. Nonces and session
//! keys are SHA-256 over a canonical concatenation of the identifying
//! fields: the principal id as UTF-8, the transaction's unix seconds as
//! ASCII decimal, and a purpose label that separates derivation domains.
//! Freshness comes from the ordering timestamp; the label binds each value
//! to its purpose; the principal id keeps concurrent principals apart.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::encoding::b64_encode;
use crate::error::CryptoError;
use crate::Result;

/// Derivation label of the client-TGS session key
pub const LABEL_TGS_SESSION: &str = "KU,TGS";
/// Derivation label of the client-service session key
pub const LABEL_SERVICE_SESSION: &str = "KU,SS";

/// SHA-256 of a byte string
pub fn sha256(bytes: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hasher.finalize().into()
}

/// Hex SHA-256, the form used in audit records and suppression keys
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(sha256(bytes))
}

/// Challenge nonce for a client at a transaction time
///
/// `base64(SHA-256(clientID ‖ unixSeconds))`: unguessable to parties that
/// cannot observe the ordering stream, and tied to both the client and the
/// issuing transaction.
pub fn derive_nonce(client_id: &str, unix_secs: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(unix_secs.to_string().as_bytes());
    b64_encode(hasher.finalize())
}

/// Symmetric session key for a client at a transaction time
///
/// `base64(SHA-256(clientID ‖ unixSeconds ‖ label))` with the label either
/// [`LABEL_TGS_SESSION`] or [`LABEL_SERVICE_SESSION`].
pub fn derive_session_key(client_id: &str, unix_secs: u64, label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(unix_secs.to_string().as_bytes());
    hasher.update(label.as_bytes());
    b64_encode(hasher.finalize())
}

/// Recover the 32 raw key bytes from a conveyed session key
pub fn session_key_bytes(session_key: &str) -> Result<[u8; 32]> {
    let bytes = crate::encoding::b64_decode(session_key)?;
    bytes.try_into().map_err(|_| {
        CryptoError::EncodingInvalid("session key is not 32 bytes once decoded".to_string())
    })
}

/// Deterministic padding stream for in-transaction RSA encryption
///
/// PKCS#1 v1.5 encryption consumes random padding bytes; inside a
/// transaction that randomness must replay identically, so the stream is
/// ChaCha20 keyed by SHA-256 over the transaction id, the transaction
/// time, and the plaintext digest. Distinct plaintexts or transactions get
/// unrelated pads.
pub fn padding_rng(tx_id: &str, unix_secs: u64, plaintext_digest: &[u8; 32]) -> ChaCha20Rng {
    let mut hasher = Sha256::new();
    hasher.update(b"RSA-PKCS1-PAD");
    hasher.update(tx_id.as_bytes());
    hasher.update(unix_secs.to_string().as_bytes());
    hasher.update(plaintext_digest);
    ChaCha20Rng::from_seed(hasher.finalize().into())
}

/// Deterministic 96-bit AEAD nonce from context fields
///
/// Used for envelopes sealed inside a transaction, where the context
/// (transaction id plus the envelope's purpose and addressee) is unique
/// per sealed message by construction.
pub fn deterministic_aead_nonce(context: &[&[u8]]) -> [u8; 12] {
    let mut hasher = Sha256::new();
    hasher.update(b"AEAD-NONCE");
    for part in context {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&digest[..12]);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_nonce_derivation_is_deterministic() {
        assert_eq!(
            derive_nonce("c1", 1_700_000_000),
            derive_nonce("c1", 1_700_000_000)
        );
        assert_ne!(
            derive_nonce("c1", 1_700_000_000),
            derive_nonce("c1", 1_700_000_001)
        );
        assert_ne!(
            derive_nonce("c1", 1_700_000_000),
            derive_nonce("c2", 1_700_000_000)
        );
    }

    #[test]
    fn test_labels_separate_session_keys() {
        let tgs = derive_session_key("c1", 1_700_000_000, LABEL_TGS_SESSION);
        let service = derive_session_key("c1", 1_700_000_000, LABEL_SERVICE_SESSION);
        assert_ne!(tgs, service);
        // Session keys decode to exactly 32 bytes.
        assert_eq!(session_key_bytes(&tgs).unwrap().len(), 32);
    }

    #[test]
    fn test_padding_rng_replays_identically() {
        let digest = sha256(b"payload");
        let mut a = padding_rng("tx-1", 7, &digest);
        let mut b = padding_rng("tx-1", 7, &digest);
        assert_eq!(a.next_u64(), b.next_u64());

        let mut c = padding_rng("tx-2", 7, &digest);
        assert_ne!(a.next_u64(), c.next_u64());
    }

    #[test]
    fn test_aead_nonce_length_prefixing_prevents_ambiguity() {
        // ("ab","c") and ("a","bc") must not collapse to one context.
        let left = deterministic_aead_nonce(&[b"ab", b"c"]);
        let right = deterministic_aead_nonce(&[b"a", b"bc"]);
        assert_ne!(left, right);
    }
}
