//! RSA PKCS#1 v1.5 encryption and signatures
//!
//! Tickets and wrapped session keys are encrypted for the next hop with
//! PKCS#1 v1.5; identity proofs are PKCS#1 v1.5 signatures over SHA-256
//! digests. A 2048-bit modulus bounds plaintexts at 245 bytes, which every
//! ticket fits inside; oversize plaintexts are an encoding error, not a
//! truncation.

use crate::error::CryptoError;
use crate::Result;
use rand::{CryptoRng, RngCore};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// Encrypt a plaintext for the holder of `public`
///
/// The RNG supplies the PKCS#1 v1.5 padding bytes: callers inside a
/// transaction pass the deterministic stream from
/// [`crate::derive::padding_rng`]; client-side callers pass the OS RNG.
pub fn encrypt<R: RngCore + CryptoRng>(
    rng: &mut R,
    public: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    public
        .encrypt(rng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| CryptoError::EncodingInvalid(format!("RSA encrypt: {e}")))
}

/// Decrypt a ciphertext with the component's private key
pub fn decrypt(private: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    private
        .decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| CryptoError::DecryptFailed(format!("RSA decrypt: {e}")))
}

/// Sign a SHA-256 digest with PKCS#1 v1.5
pub fn sign_digest(private: &RsaPrivateKey, digest: &[u8; 32]) -> Result<Vec<u8>> {
    private
        .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
        .map_err(|e| CryptoError::EncodingInvalid(format!("RSA sign: {e}")))
}

/// Verify a PKCS#1 v1.5 signature over a SHA-256 digest
pub fn verify_digest(public: &RsaPublicKey, digest: &[u8; 32], signature: &[u8]) -> Result<()> {
    public
        .verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
        .map_err(|_| CryptoError::SignatureInvalid("digest signature rejected".to_string()))
}
