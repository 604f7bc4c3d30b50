//! Authentication Server operations
//!
//! Every operation executes inside one ledger transaction handed in by the
//! caller. Nothing is retried here; failures surface as typed errors and
//! leave no staged writes behind when the caller abandons the transaction.

use crate::keyring;
use crate::records::{AuthChallenge, ClientAuthState, ClientIdentity};
use rsa::RsaPublicKey;
use tessera_core::ticket::DEFAULT_TICKET_LIFETIME_SECS;
use tessera_core::wire::{NonceChallenge, TgtResponse};
use tessera_core::{state_keys, AuditRecord, ClientId, Result, TesseraError, Ticket};
use tessera_crypto::derive::{
    derive_nonce, derive_session_key, padding_rng, sha256, sha256_hex, LABEL_TGS_SESSION,
};
use tessera_crypto::encoding::{b64_decode, b64_encode};
use tessera_crypto::{asymmetric, pem};
use tessera_ledger::codec::{put_json, require_json};
use tessera_ledger::LedgerState;
use tracing::{debug, info};

/// Authentication Server policy knobs
#[derive(Debug, Clone)]
pub struct AuthServerConfig {
    /// Challenge lifetime in seconds
    pub challenge_lifetime_secs: u64,
    /// Lifetime of minted TGTs in seconds
    pub ticket_lifetime_secs: u64,
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self {
            challenge_lifetime_secs: 300,
            ticket_lifetime_secs: DEFAULT_TICKET_LIFETIME_SECS,
        }
    }
}

/// The Authentication Server
#[derive(Debug, Clone, Default)]
pub struct AuthServer {
    config: AuthServerConfig,
}

impl AuthServer {
    /// Create a server with default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server with custom policy
    pub fn with_config(config: AuthServerConfig) -> Self {
        Self { config }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Seed the AS keypair into the ledger
    ///
    /// One-shot: re-running fails with `AlreadyExists`. The private key
    /// stays under the AS-private `AS_PRIVATE_KEY` key; the public half is
    /// published for clients.
    pub async fn initialize(
        &self,
        ledger: &dyn LedgerState,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<()> {
        if ledger.get(state_keys::AS_PUBLIC_KEY).await?.is_some() {
            return Err(TesseraError::already_exists(
                "authentication server keypair is already seeded",
            ));
        }
        let private = pem::parse_private_key(private_key_pem)?;
        let public = pem::parse_public_key(public_key_pem)?;
        if RsaPublicKey::from(&private) != public {
            return Err(TesseraError::invalid_input(
                "public key does not match private key",
            ));
        }
        ledger
            .put(
                state_keys::AS_PRIVATE_KEY,
                private_key_pem.as_bytes().to_vec(),
            )
            .await?;
        ledger
            .put(
                state_keys::AS_PUBLIC_KEY,
                public_key_pem.as_bytes().to_vec(),
            )
            .await?;
        info!("authentication server initialized");
        Ok(())
    }

    // =========================================================================
    // Client registry
    // =========================================================================

    /// Register a client principal with its RSA public key
    pub async fn register_client(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
        public_key_pem: &str,
    ) -> Result<ClientIdentity> {
        let key = state_keys::client(client_id);
        if ledger.get(&key).await?.is_some() {
            return Err(TesseraError::already_exists(format!(
                "client {client_id} is already registered"
            )));
        }
        pem::parse_public_key(public_key_pem)?;

        let identity = ClientIdentity {
            id: client_id.clone(),
            public_key_pem: public_key_pem.to_string(),
            registration_time: ledger.tx_timestamp().unix_secs(),
            valid: true,
        };
        put_json(ledger, &key, &identity).await?;
        ledger
            .put(
                &state_keys::client_pk(client_id),
                public_key_pem.as_bytes().to_vec(),
            )
            .await?;
        info!(client_id = %client_id, "client registered");
        Ok(identity)
    }

    /// Whether the client exists and is marked valid
    pub async fn check_client_validity(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<bool> {
        let identity: ClientIdentity =
            require_json(ledger, &state_keys::client(client_id)).await?;
        Ok(identity.valid)
    }

    /// Read back a client identity record
    pub async fn get_client_identity(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<ClientIdentity> {
        require_json(ledger, &state_keys::client(client_id)).await
    }

    /// Derived authentication state of a client
    pub async fn client_auth_state(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<ClientAuthState> {
        let identity: Option<ClientIdentity> =
            tessera_ledger::codec::get_json(ledger, &state_keys::client(client_id)).await?;
        if identity.is_none() {
            return Ok(ClientAuthState::Unregistered);
        }
        let challenge: Option<AuthChallenge> =
            tessera_ledger::codec::get_json(ledger, &state_keys::auth_challenge(client_id)).await?;
        match challenge {
            Some(challenge) if !challenge.is_expired(ledger.tx_timestamp()) => {
                Ok(ClientAuthState::ChallengeOutstanding { challenge })
            }
            _ => Ok(ClientAuthState::Registered),
        }
    }

    // =========================================================================
    // Challenge-response
    // =========================================================================

    /// Issue a fresh nonce challenge, overwriting any prior one
    pub async fn initiate_authentication(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<NonceChallenge> {
        self.require_valid_client(ledger, client_id).await?;

        let now = ledger.tx_timestamp();
        let challenge = AuthChallenge {
            client_id: client_id.clone(),
            nonce: derive_nonce(client_id.as_str(), now.unix_secs()),
            expiration_time: now.unix_secs() + self.config.challenge_lifetime_secs,
            created_at: now.unix_secs(),
        };
        put_json(ledger, &state_keys::auth_challenge(client_id), &challenge).await?;
        debug!(client_id = %client_id, expires = challenge.expiration_time, "challenge issued");
        Ok(NonceChallenge {
            nonce: challenge.nonce,
            expiration_time: challenge.expiration_time,
        })
    }

    /// Verify possession via a PKCS#1 v1.5 signature over SHA-256 of the
    /// raw nonce bytes
    ///
    /// On success the challenge is consumed. A bad signature leaves the
    /// challenge in place so the same client may retry until expiry; an
    /// expired challenge is reaped and reported.
    pub async fn verify_client_identity_with_signature(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
        signature_b64: &str,
    ) -> Result<bool> {
        let (key, challenge) = self.load_live_challenge(ledger, client_id).await?;

        let nonce_bytes = b64_decode(&challenge.nonce)?;
        let digest = sha256(&nonce_bytes);
        let signature = b64_decode(signature_b64)?;
        let public = keyring::client_public_key(ledger, client_id).await?;
        asymmetric::verify_digest(&public, &digest, &signature).map_err(|_| {
            TesseraError::signature_invalid(format!(
                "challenge signature for client {client_id} rejected"
            ))
        })?;

        ledger.delete(&key).await?;
        info!(client_id = %client_id, "client identity verified by signature");
        Ok(true)
    }

    /// Verify possession via decryption: the client returns the nonce bytes
    /// encrypted under the AS public key
    ///
    /// Same expiry and consumption semantics as the signature variant; a
    /// recovered value that differs from the stored nonce fails `Mismatch`
    /// and leaves the challenge in place.
    pub async fn verify_client_identity(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
        encrypted_nonce_b64: &str,
    ) -> Result<bool> {
        let (key, challenge) = self.load_live_challenge(ledger, client_id).await?;

        let ciphertext = b64_decode(encrypted_nonce_b64)?;
        let private = keyring::private_key(ledger).await?;
        let recovered = asymmetric::decrypt(&private, &ciphertext)?;
        if b64_encode(&recovered) != challenge.nonce {
            return Err(TesseraError::mismatch(format!(
                "recovered nonce for client {client_id} does not match the outstanding challenge"
            )));
        }

        ledger.delete(&key).await?;
        info!(client_id = %client_id, "client identity verified by decryption");
        Ok(true)
    }

    // =========================================================================
    // TGT minting
    // =========================================================================

    /// Mint a TGT for a verified client
    ///
    /// The TGT is encrypted under the TGS public key; the embedded session
    /// key is separately encrypted under the client's registered public
    /// key. An audit record binds the mint to this transaction.
    pub async fn generate_tgt(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<TgtResponse> {
        let identity = self.require_valid_client(ledger, client_id).await?;

        let now = ledger.tx_timestamp();
        let unix = now.unix_secs();
        let session_key = derive_session_key(client_id.as_str(), unix, LABEL_TGS_SESSION);
        let ticket = Ticket {
            client_id: client_id.clone(),
            session_key: session_key.clone(),
            timestamp: unix,
            lifetime_seconds: self.config.ticket_lifetime_secs,
        };
        let ticket_json = serde_json::to_vec(&ticket)?;
        let ticket_digest = sha256(&ticket_json);

        let tgs_public = keyring::tgs_public_key(ledger).await?;
        let encrypted_tgt = asymmetric::encrypt(
            &mut padding_rng(ledger.tx_id(), unix, &ticket_digest),
            &tgs_public,
            &ticket_json,
        )?;

        let client_public = pem::parse_public_key(&identity.public_key_pem)?;
        let session_key_digest = sha256(session_key.as_bytes());
        let encrypted_session_key = asymmetric::encrypt(
            &mut padding_rng(ledger.tx_id(), unix, &session_key_digest),
            &client_public,
            session_key.as_bytes(),
        )?;

        let audit = AuditRecord::new(ledger.tx_id(), now)
            .with_client(client_id.clone())
            .with_digest(sha256_hex(&ticket_json));
        put_json(ledger, &state_keys::tgt_audit(client_id, unix), &audit).await?;

        info!(client_id = %client_id, expires = ticket.expires_at(), "TGT minted");
        Ok(TgtResponse {
            encrypted_tgt: b64_encode(&encrypted_tgt),
            encrypted_session_key: b64_encode(&encrypted_session_key),
        })
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn require_valid_client(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<ClientIdentity> {
        let identity: ClientIdentity =
            require_json(ledger, &state_keys::client(client_id)).await?;
        if !identity.valid {
            return Err(TesseraError::not_authorized(format!(
                "client {client_id} is marked invalid"
            )));
        }
        Ok(identity)
    }

    /// Load the outstanding challenge, reaping it if expired
    async fn load_live_challenge(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<(String, AuthChallenge)> {
        let key = state_keys::auth_challenge(client_id);
        let challenge: AuthChallenge = require_json(ledger, &key).await?;
        let now = ledger.tx_timestamp();
        if challenge.is_expired(now) {
            ledger.delete(&key).await?;
            return Err(TesseraError::expired(format!(
                "challenge for client {client_id} expired at {}",
                challenge.expiration_time
            )));
        }
        Ok((key, challenge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use rsa::RsaPrivateKey;
    use tessera_core::TxTimestamp;
    use tessera_crypto::keys::generate_keypair;
    use tessera_ledger::{LedgerTransaction, MemoryLedger};

    struct TestKeys {
        as_public_pem: String,
        as_private_pem: String,
        tgs_private: RsaPrivateKey,
        tgs_public_pem: String,
        client_private: RsaPrivateKey,
        client_public_pem: String,
        intruder_private: RsaPrivateKey,
    }

    static KEYS: Lazy<TestKeys> = Lazy::new(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0xA5);
        let (as_private, as_public) = generate_keypair(&mut rng, 2048).unwrap();
        let (tgs_private, tgs_public) = generate_keypair(&mut rng, 2048).unwrap();
        let (client_private, client_public) = generate_keypair(&mut rng, 2048).unwrap();
        let (intruder_private, _) = generate_keypair(&mut rng, 2048).unwrap();
        TestKeys {
            as_private_pem: pem::private_key_to_pem(&as_private).unwrap(),
            as_public_pem: pem::public_key_to_pem(&as_public).unwrap(),
            tgs_public_pem: pem::public_key_to_pem(&tgs_public).unwrap(),
            tgs_private,
            client_public_pem: pem::public_key_to_pem(&client_public).unwrap(),
            client_private,
            intruder_private,
        }
    });

    fn c1() -> ClientId {
        ClientId::new("c1").unwrap()
    }

    fn tx(ledger: &MemoryLedger, secs: u64, id: &str) -> LedgerTransaction {
        ledger.begin(TxTimestamp::from_secs(secs), id.to_string())
    }

    async fn bootstrapped() -> (MemoryLedger, AuthServer) {
        let ledger = MemoryLedger::new();
        let server = AuthServer::new();
        let setup = tx(&ledger, 100, "tx-init");
        server
            .initialize(&setup, &KEYS.as_private_pem, &KEYS.as_public_pem)
            .await
            .unwrap();
        // The TGS publishes its own key at its initialization; seed it here.
        setup
            .put(
                state_keys::TGS_PUBLIC_KEY,
                KEYS.tgs_public_pem.as_bytes().to_vec(),
            )
            .await
            .unwrap();
        setup.commit().unwrap();
        (ledger, server)
    }

    fn sign_nonce(private: &RsaPrivateKey, nonce_b64: &str) -> String {
        let nonce_bytes = b64_decode(nonce_b64).unwrap();
        let digest = sha256(&nonce_bytes);
        b64_encode(asymmetric::sign_digest(private, &digest).unwrap())
    }

    #[tokio::test]
    async fn test_initialize_is_one_shot() {
        let (ledger, server) = bootstrapped().await;
        let again = tx(&ledger, 101, "tx-again");
        let err = server
            .initialize(&again, &KEYS.as_private_pem, &KEYS.as_public_pem)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "already_exists");
    }

    #[tokio::test]
    async fn test_register_client_and_duplicate() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        let identity = server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        assert!(identity.valid);
        assert_eq!(identity.registration_time, 200);
        t.commit().unwrap();

        let t = tx(&ledger, 201, "tx-2");
        let err = server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "already_exists");
        assert!(server.check_client_validity(&t, &c1()).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_pem() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        let err = server
            .register_client(&t, &c1(), "not a key")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_pem");
    }

    #[tokio::test]
    async fn test_validity_of_unknown_client_is_not_found() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        let err = server.check_client_validity(&t, &c1()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_signature_verification_consumes_challenge() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        t.commit().unwrap();

        let t = tx(&ledger, 210, "tx-2");
        let challenge = server.initiate_authentication(&t, &c1()).await.unwrap();
        assert_eq!(challenge.expiration_time, 510);
        t.commit().unwrap();
        assert!(matches!(
            server
                .client_auth_state(&tx(&ledger, 211, "tx-s"), &c1())
                .await
                .unwrap(),
            ClientAuthState::ChallengeOutstanding { .. }
        ));

        let t = tx(&ledger, 220, "tx-3");
        let signature = sign_nonce(&KEYS.client_private, &challenge.nonce);
        assert!(server
            .verify_client_identity_with_signature(&t, &c1(), &signature)
            .await
            .unwrap());
        t.commit().unwrap();

        // Challenge is consumed.
        assert!(ledger
            .get_committed(&state_keys::auth_challenge(&c1()))
            .is_none());
    }

    #[tokio::test]
    async fn test_wrong_signer_leaves_challenge_in_place() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        let challenge = server.initiate_authentication(&t, &c1()).await.unwrap();
        t.commit().unwrap();

        let t = tx(&ledger, 210, "tx-2");
        let forged = sign_nonce(&KEYS.intruder_private, &challenge.nonce);
        let err = server
            .verify_client_identity_with_signature(&t, &c1(), &forged)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "signature_invalid");
        t.commit().unwrap();

        // The client may retry with the correct key until expiry.
        let t = tx(&ledger, 220, "tx-3");
        let signature = sign_nonce(&KEYS.client_private, &challenge.nonce);
        assert!(server
            .verify_client_identity_with_signature(&t, &c1(), &signature)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_expired_challenge_is_reaped() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        let challenge = server.initiate_authentication(&t, &c1()).await.unwrap();
        t.commit().unwrap();

        // 301 seconds later the challenge is past its 300 s lifetime.
        let t = tx(&ledger, 501, "tx-2");
        let signature = sign_nonce(&KEYS.client_private, &challenge.nonce);
        let err = server
            .verify_client_identity_with_signature(&t, &c1(), &signature)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "expired");
        t.commit().unwrap();
        assert!(ledger
            .get_committed(&state_keys::auth_challenge(&c1()))
            .is_none());
    }

    #[tokio::test]
    async fn test_new_challenge_overwrites_old() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        let first = server.initiate_authentication(&t, &c1()).await.unwrap();
        t.commit().unwrap();

        let t = tx(&ledger, 230, "tx-2");
        let second = server.initiate_authentication(&t, &c1()).await.unwrap();
        t.commit().unwrap();
        assert_ne!(first.nonce, second.nonce);

        // Only the latest nonce verifies.
        let t = tx(&ledger, 240, "tx-3");
        let stale = sign_nonce(&KEYS.client_private, &first.nonce);
        assert_eq!(
            server
                .verify_client_identity_with_signature(&t, &c1(), &stale)
                .await
                .unwrap_err()
                .kind(),
            "signature_invalid"
        );
        let fresh = sign_nonce(&KEYS.client_private, &second.nonce);
        assert!(server
            .verify_client_identity_with_signature(&t, &c1(), &fresh)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_decryption_variant_verifies_and_rejects_mismatch() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        let challenge = server.initiate_authentication(&t, &c1()).await.unwrap();
        t.commit().unwrap();

        let as_public = pem::parse_public_key(&KEYS.as_public_pem).unwrap();
        let nonce_bytes = b64_decode(&challenge.nonce).unwrap();

        // Wrong plaintext: decrypts fine but does not match the nonce.
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let wrong = asymmetric::encrypt(&mut rng, &as_public, b"other bytes").unwrap();
        let t = tx(&ledger, 210, "tx-2");
        assert_eq!(
            server
                .verify_client_identity(&t, &c1(), &b64_encode(&wrong))
                .await
                .unwrap_err()
                .kind(),
            "mismatch"
        );

        let right = asymmetric::encrypt(&mut rng, &as_public, &nonce_bytes).unwrap();
        assert!(server
            .verify_client_identity(&t, &c1(), &b64_encode(&right))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_generate_tgt_round_trips_through_tgs_key() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        server
            .register_client(&t, &c1(), &KEYS.client_public_pem)
            .await
            .unwrap();
        let response = server.generate_tgt(&t, &c1()).await.unwrap();
        t.commit().unwrap();

        // The TGT decrypts under the TGS private key to a live ticket for c1.
        let ticket_json = asymmetric::decrypt(
            &KEYS.tgs_private,
            &b64_decode(&response.encrypted_tgt).unwrap(),
        )
        .unwrap();
        let ticket: Ticket = serde_json::from_slice(&ticket_json).unwrap();
        assert_eq!(ticket.client_id, c1());
        assert_eq!(ticket.timestamp, 200);
        assert_eq!(ticket.lifetime_seconds, 3_600);
        assert!(!ticket.is_expired(TxTimestamp::from_secs(200)));

        // The session key decrypts under the client private key and matches.
        let session_key = asymmetric::decrypt(
            &KEYS.client_private,
            &b64_decode(&response.encrypted_session_key).unwrap(),
        )
        .unwrap();
        assert_eq!(session_key, ticket.session_key.as_bytes());

        // Audit record implies success.
        assert!(ledger
            .get_committed(&state_keys::tgt_audit(&c1(), 200))
            .is_some());
    }

    #[tokio::test]
    async fn test_generate_tgt_requires_registration() {
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        assert_eq!(
            server.generate_tgt(&t, &c1()).await.unwrap_err().kind(),
            "not_found"
        );
    }

    #[tokio::test]
    async fn test_as_private_key_never_in_responses() {
        // Guard against secrets leaking through error messages.
        let (ledger, server) = bootstrapped().await;
        let t = tx(&ledger, 200, "tx-1");
        let err = server.check_client_validity(&t, &c1()).await.unwrap_err();
        assert!(!err.to_string().contains("PRIVATE"));
    }
}
