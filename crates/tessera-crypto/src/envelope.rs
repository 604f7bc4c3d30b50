//! AES-256-GCM session-key envelope
//!
//! Everything that travels under a symmetric session key (authenticators,
//! wrapped service session keys, granted response payloads) uses this
//! envelope: a 96-bit nonce followed by the AEAD ciphertext. The key is the
//! 32-byte decoding of a derived session key.
//!
//! Nonce discipline: client-side sealers draw the nonce from the OS RNG;
//! in-transaction sealers derive it from the sealing context via
//! [`crate::derive::deterministic_aead_nonce`], which is unique per sealed
//! message because the transaction id participates.

use crate::derive::deterministic_aead_nonce;
use crate::error::CryptoError;
use crate::Result;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::{CryptoRng, RngCore};

/// Length of the nonce prefix on every sealed blob
pub const NONCE_LEN: usize = 12;

fn cipher(key: &[u8; 32]) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
}

fn seal_with_nonce(key: &[u8; 32], nonce: [u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let ciphertext = cipher(key)
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncodingInvalid("AEAD seal".to_string()))?;
    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Seal with a random nonce (client side only)
pub fn seal_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &[u8; 32],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    seal_with_nonce(key, nonce, plaintext)
}

/// Seal with a context-derived nonce (replicated side)
pub fn seal_deterministic(key: &[u8; 32], context: &[&[u8]], plaintext: &[u8]) -> Result<Vec<u8>> {
    seal_with_nonce(key, deterministic_aead_nonce(context), plaintext)
}

/// Open a sealed blob
pub fn open(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() <= NONCE_LEN {
        return Err(CryptoError::DecryptFailed(
            "sealed blob shorter than its nonce".to_string(),
        ));
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    cipher(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptFailed("AEAD open".to_string()))
}
