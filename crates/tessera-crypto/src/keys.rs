//! RSA keypair generation
//!
//! Key generation is an out-of-band concern: the ticket servers receive
//! public keys as PEM input and never generate keys inside a transaction.
//! This helper exists for the administrative `initialize` command, the
//! client-side tooling, and test fixtures, which is why the RNG is a
//! parameter rather than the OS pool.

use crate::error::CryptoError;
use crate::Result;
use rand::{CryptoRng, RngCore};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Generate an RSA keypair of the given modulus size
pub fn generate_keypair<R: RngCore + CryptoRng>(
    rng: &mut R,
    bits: usize,
) -> Result<(RsaPrivateKey, RsaPublicKey)> {
    let private = RsaPrivateKey::new(rng, bits)
        .map_err(|e| CryptoError::EncodingInvalid(format!("keygen: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok((private, public))
}

/// Generate a keypair and serialize both halves as PEM
pub fn generate_keypair_pems<R: RngCore + CryptoRng>(
    rng: &mut R,
    bits: usize,
) -> Result<(String, String)> {
    let (private, public) = generate_keypair(rng, bits)?;
    Ok((
        crate::pem::private_key_to_pem(&private)?,
        crate::pem::public_key_to_pem(&public)?,
    ))
}
