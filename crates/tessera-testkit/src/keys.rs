//! Shared RSA test keys
//!
//! 2048-bit generation is the slowest thing any test does, so one fixture
//! set is generated lazily from a seeded stream and shared by every test
//! in the binary. The seed is fixed: key bytes are identical across runs,
//! which the determinism tests rely on.

use once_cell::sync::Lazy;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rsa::RsaPrivateKey;
use tessera_crypto::keys::generate_keypair;
use tessera_crypto::pem;

/// One set of fixture keypairs for the whole test binary
pub struct TestKeys {
    /// AS private key PEM
    pub as_private_pem: String,
    /// AS public key PEM
    pub as_public_pem: String,
    /// TGS private key PEM
    pub tgs_private_pem: String,
    /// TGS public key PEM
    pub tgs_public_pem: String,
    /// TGS private key, for asserting on minted TGTs
    pub tgs_private: RsaPrivateKey,
    /// ISV private key PEM
    pub isv_private_pem: String,
    /// ISV public key PEM
    pub isv_public_pem: String,
    /// ISV private key, for asserting on minted service tickets
    pub isv_private: RsaPrivateKey,
    /// Client c1 private key PEM
    pub client_private_pem: String,
    /// A second client's private key PEM
    pub second_client_private_pem: String,
    /// Device d1 private key
    pub device_private: RsaPrivateKey,
    /// Device d1 public key PEM
    pub device_public_pem: String,
    /// A key that belongs to nobody in the system
    pub intruder_private_pem: String,
}

static KEYS: Lazy<TestKeys> = Lazy::new(|| {
    let mut rng = ChaCha20Rng::seed_from_u64(0x7E55E7A);
    let (as_private, as_public) = generate_keypair(&mut rng, 2048).unwrap();
    let (tgs_private, tgs_public) = generate_keypair(&mut rng, 2048).unwrap();
    let (isv_private, isv_public) = generate_keypair(&mut rng, 2048).unwrap();
    let (client_private, _) = generate_keypair(&mut rng, 2048).unwrap();
    let (second_client_private, _) = generate_keypair(&mut rng, 2048).unwrap();
    let (device_private, device_public) = generate_keypair(&mut rng, 2048).unwrap();
    let (intruder_private, _) = generate_keypair(&mut rng, 2048).unwrap();
    TestKeys {
        as_private_pem: pem::private_key_to_pem(&as_private).unwrap(),
        as_public_pem: pem::public_key_to_pem(&as_public).unwrap(),
        tgs_private_pem: pem::private_key_to_pem(&tgs_private).unwrap(),
        tgs_public_pem: pem::public_key_to_pem(&tgs_public).unwrap(),
        tgs_private,
        isv_private_pem: pem::private_key_to_pem(&isv_private).unwrap(),
        isv_public_pem: pem::public_key_to_pem(&isv_public).unwrap(),
        isv_private,
        client_private_pem: pem::private_key_to_pem(&client_private).unwrap(),
        second_client_private_pem: pem::private_key_to_pem(&second_client_private).unwrap(),
        device_public_pem: pem::public_key_to_pem(&device_public).unwrap(),
        device_private,
        intruder_private_pem: pem::private_key_to_pem(&intruder_private).unwrap(),
    }
});

/// The shared fixture keys
pub fn test_keys() -> &'static TestKeys {
    &KEYS
}
