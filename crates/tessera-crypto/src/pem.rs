//! PEM codec for RSA keys
//!
//! Keys cross the trust boundary as PEM text. Both SubjectPublicKeyInfo
//! ("PUBLIC KEY") and PKCS#1 ("RSA PUBLIC KEY") encodings are accepted on
//! input; output is always PKCS#8/SPKI. A key that parses but falls below
//! the 2048-bit floor is rejected as [`CryptoError::WrongKeyType`] before
//! it can enter state.

use crate::error::CryptoError;
use crate::Result;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Minimum accepted RSA modulus size in bits
pub const MIN_RSA_BITS: usize = 2048;

/// Parse an RSA public key PEM and enforce the size floor
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    let key = match RsaPublicKey::from_public_key_pem(pem) {
        Ok(key) => key,
        Err(spki_err) => RsaPublicKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
            CryptoError::InvalidPem(format!(
                "not an RSA public key (spki: {spki_err}; pkcs1: {pkcs1_err})"
            ))
        })?,
    };
    check_size(key.size() * 8)?;
    Ok(key)
}

/// Parse an RSA private key PEM and enforce the size floor
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
        Ok(key) => key,
        Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
            CryptoError::InvalidPem(format!(
                "not an RSA private key (pkcs8: {pkcs8_err}; pkcs1: {pkcs1_err})"
            ))
        })?,
    };
    check_size(key.size() * 8)?;
    Ok(key)
}

/// Serialize a public key as SPKI PEM
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::EncodingInvalid(format!("public key PEM: {e}")))
}

/// Serialize a private key as PKCS#8 PEM
pub fn private_key_to_pem(key: &RsaPrivateKey) -> Result<String> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| CryptoError::EncodingInvalid(format!("private key PEM: {e}")))
}

fn check_size(bits: usize) -> Result<()> {
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::WrongKeyType(format!(
            "RSA modulus is {bits} bits, minimum is {MIN_RSA_BITS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_public_key_pem_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let (_, public) = generate_keypair(&mut rng, MIN_RSA_BITS).unwrap();
        let pem = public_key_to_pem(&public).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        let parsed = parse_public_key(&pem).unwrap();
        assert_eq!(parsed, public);
    }

    #[test]
    fn test_undersized_key_is_wrong_key_type() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let (_, public) = generate_keypair(&mut rng, 1024).unwrap();
        let pem = public_key_to_pem(&public).unwrap();
        assert!(matches!(
            parse_public_key(&pem),
            Err(CryptoError::WrongKeyType(_))
        ));
    }

    #[test]
    fn test_garbage_is_invalid_pem() {
        assert!(matches!(
            parse_public_key("not a pem"),
            Err(CryptoError::InvalidPem(_))
        ));
        assert!(matches!(
            parse_private_key("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n"),
            Err(CryptoError::InvalidPem(_))
        ));
    }
}
