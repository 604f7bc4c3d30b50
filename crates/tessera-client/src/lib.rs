//! # Tessera Client
//!
//! The non-replicated side of the ticket flow: what a client (or a test
//! standing in for one) does between calls to the three servers. Sign a
//! challenge, answer it by encryption, unwrap session keys, build
//! authenticators, and open granted payloads.
//!
//! This crate is the only place outside key generation where OS randomness
//! is appropriate, because clients are not replicated state machines. Server-side
//! crates must not depend on it.

#![forbid(unsafe_code)]

use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tessera_core::wire::Authenticator;
use tessera_core::{ClientId, Result, TesseraError};
use tessera_crypto::derive::{session_key_bytes, sha256};
use tessera_crypto::encoding::{b64_decode, b64_encode};
use tessera_crypto::{asymmetric, envelope, pem};

/// A client's key material and identity
pub struct ClientCredentials {
    /// The client's identifier as registered with the AS
    pub client_id: ClientId,
    private_key: RsaPrivateKey,
}

impl ClientCredentials {
    /// Wrap an id and private key PEM into credentials
    pub fn new(client_id: ClientId, private_key_pem: &str) -> Result<Self> {
        let private_key = pem::parse_private_key(private_key_pem)?;
        Ok(Self {
            client_id,
            private_key,
        })
    }

    /// The public half as PEM, for registration with the AS
    pub fn public_key_pem(&self) -> Result<String> {
        Ok(pem::public_key_to_pem(&RsaPublicKey::from(
            &self.private_key,
        ))?)
    }

    /// Answer a challenge by signature: PKCS#1 v1.5 over SHA-256 of the
    /// raw nonce bytes
    pub fn sign_challenge(&self, nonce_b64: &str) -> Result<String> {
        let nonce_bytes = b64_decode(nonce_b64)?;
        let digest = sha256(&nonce_bytes);
        let signature = asymmetric::sign_digest(&self.private_key, &digest)?;
        Ok(b64_encode(&signature))
    }

    /// Answer a challenge by encryption: the raw nonce bytes under the AS
    /// public key
    pub fn encrypt_nonce_response(&self, as_public_pem: &str, nonce_b64: &str) -> Result<String> {
        let as_public = pem::parse_public_key(as_public_pem)?;
        let nonce_bytes = b64_decode(nonce_b64)?;
        let ciphertext = asymmetric::encrypt(&mut OsRng, &as_public, &nonce_bytes)?;
        Ok(b64_encode(&ciphertext))
    }

    /// Recover the TGT session key the AS wrapped under our public key
    pub fn unwrap_tgt_session_key(&self, encrypted_session_key_b64: &str) -> Result<String> {
        let ciphertext = b64_decode(encrypted_session_key_b64)?;
        let plaintext = asymmetric::decrypt(&self.private_key, &ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|_| TesseraError::decrypt_failed("recovered session key is not UTF-8"))
    }

    /// Build an authenticator proving liveness under the TGT session key
    pub fn build_authenticator(&self, tgt_session_key: &str, unix_now: u64) -> Result<String> {
        let plaintext = serde_json::to_vec(&Authenticator {
            client_id: self.client_id.clone(),
            timestamp: unix_now,
        })?;
        let key = session_key_bytes(tgt_session_key)?;
        let sealed = envelope::seal_with_rng(&mut OsRng, &key, &plaintext)?;
        Ok(b64_encode(&sealed))
    }
}

/// Recover the service session key the TGS wrapped under the TGT session key
pub fn unwrap_service_session_key(
    tgt_session_key: &str,
    encrypted_session_key_b64: &str,
) -> Result<String> {
    let sealed = b64_decode(encrypted_session_key_b64)?;
    let key = session_key_bytes(tgt_session_key)?;
    let plaintext = envelope::open(&key, &sealed)?;
    String::from_utf8(plaintext)
        .map_err(|_| TesseraError::decrypt_failed("recovered session key is not UTF-8"))
}

/// Open a payload the ISV sealed under the service session key
pub fn open_service_payload(
    service_session_key: &str,
    encrypted_data_b64: &str,
) -> Result<Vec<u8>> {
    let sealed = b64_decode(encrypted_data_b64)?;
    let key = session_key_bytes(service_session_key)?;
    Ok(envelope::open(&key, &sealed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use tessera_crypto::derive::{derive_session_key, LABEL_TGS_SESSION};
    use tessera_crypto::keys::generate_keypair;

    fn credentials() -> ClientCredentials {
        let mut rng = ChaCha20Rng::seed_from_u64(0xC1);
        let (private, _) = generate_keypair(&mut rng, 2048).unwrap();
        ClientCredentials::new(
            ClientId::new("c1").unwrap(),
            &pem::private_key_to_pem(&private).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_signed_challenge_verifies_under_own_public_key() {
        let creds = credentials();
        let nonce_b64 = b64_encode(b"challenge nonce");
        let signature = creds.sign_challenge(&nonce_b64).unwrap();

        let public = pem::parse_public_key(&creds.public_key_pem().unwrap()).unwrap();
        let digest = sha256(b"challenge nonce");
        asymmetric::verify_digest(&public, &digest, &b64_decode(&signature).unwrap()).unwrap();
    }

    #[test]
    fn test_authenticator_opens_under_session_key() {
        let creds = credentials();
        let session_key = derive_session_key("c1", 1_700_000_000, LABEL_TGS_SESSION);
        let authenticator = creds.build_authenticator(&session_key, 1_700_000_010).unwrap();

        let key = session_key_bytes(&session_key).unwrap();
        let plaintext = envelope::open(&key, &b64_decode(&authenticator).unwrap()).unwrap();
        let parsed: Authenticator = serde_json::from_slice(&plaintext).unwrap();
        assert_eq!(parsed.client_id.as_str(), "c1");
        assert_eq!(parsed.timestamp, 1_700_000_010);
    }

    #[test]
    fn test_service_session_key_unwrap_round_trip() {
        let tgt_key = derive_session_key("c1", 1_700_000_000, LABEL_TGS_SESSION);
        let service_key = derive_session_key("c1", 1_700_000_100, "KU,SS");
        let key = session_key_bytes(&tgt_key).unwrap();
        let sealed =
            envelope::seal_deterministic(&key, &[b"tx", b"wrap"], service_key.as_bytes()).unwrap();
        let unwrapped = unwrap_service_session_key(&tgt_key, &b64_encode(&sealed)).unwrap();
        assert_eq!(unwrapped, service_key);
    }
}
