//! Ticket-Granting Server operations
//!
//! Any crypto or validation failure short-circuits with a typed error and
//! the caller abandons the transaction, so no partial state is written.
//! Audit records go in only after the primary success path completes.

use crate::keyring;
use crate::records::{ClientRecord, RegistrationStatus};
use tessera_core::ticket::DEFAULT_TICKET_LIFETIME_SECS;
use tessera_core::wire::{Authenticator, ServiceTicketRequest, ServiceTicketResponse};
use tessera_core::{state_keys, AuditRecord, ClientId, Result, ServiceId, TesseraError, Ticket};
use tessera_crypto::derive::{
    derive_session_key, padding_rng, session_key_bytes, sha256, sha256_hex, LABEL_SERVICE_SESSION,
};
use tessera_crypto::encoding::{b64_decode, b64_encode};
use tessera_crypto::{asymmetric, envelope};
use tessera_ledger::codec::{get_json, put_json};
use tessera_ledger::LedgerState;
use tracing::{debug, info, warn};

/// Ticket-Granting Server policy knobs
#[derive(Debug, Clone)]
pub struct TicketGrantingServerConfig {
    /// Lifetime of minted service tickets in seconds
    pub ticket_lifetime_secs: u64,
    /// Accepted clock skew of authenticator timestamps, in seconds either way
    pub authenticator_skew_secs: u64,
}

impl Default for TicketGrantingServerConfig {
    fn default() -> Self {
        Self {
            ticket_lifetime_secs: DEFAULT_TICKET_LIFETIME_SECS,
            authenticator_skew_secs: 300,
        }
    }
}

/// The Ticket-Granting Server
#[derive(Debug, Clone, Default)]
pub struct TicketGrantingServer {
    config: TicketGrantingServerConfig,
}

impl TicketGrantingServer {
    /// Create a server with default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server with custom policy
    pub fn with_config(config: TicketGrantingServerConfig) -> Self {
        Self { config }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Seed the TGS keypair into the ledger (one-shot)
    pub async fn initialize(
        &self,
        ledger: &dyn LedgerState,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<()> {
        if ledger.get(state_keys::TGS_PUBLIC_KEY).await?.is_some() {
            return Err(TesseraError::already_exists(
                "ticket-granting server keypair is already seeded",
            ));
        }
        let private = tessera_crypto::pem::parse_private_key(private_key_pem)?;
        let public = tessera_crypto::pem::parse_public_key(public_key_pem)?;
        if rsa::RsaPublicKey::from(&private) != public {
            return Err(TesseraError::invalid_input(
                "public key does not match private key",
            ));
        }
        ledger
            .put(
                state_keys::TGS_PRIVATE_KEY,
                private_key_pem.as_bytes().to_vec(),
            )
            .await?;
        ledger
            .put(
                state_keys::TGS_PUBLIC_KEY,
                public_key_pem.as_bytes().to_vec(),
            )
            .await?;
        info!("ticket-granting server initialized");
        Ok(())
    }

    // =========================================================================
    // Registration from the AS
    // =========================================================================

    /// Accept a TGT presented by a client and record the registration
    ///
    /// The record's `valid_until` is the TGT's own expiry; the session key
    /// inside the TGT is retained for later authenticator verification.
    pub async fn process_registration_from_as(
        &self,
        ledger: &dyn LedgerState,
        encrypted_tgt_b64: &str,
    ) -> Result<ClientRecord> {
        let now = ledger.tx_timestamp();
        let (ticket, ticket_json) = self.decrypt_tgt(ledger, encrypted_tgt_b64).await?;
        if ticket.is_expired(now) {
            return Err(TesseraError::expired(format!(
                "TGT for client {} expired at {}",
                ticket.client_id,
                ticket.expires_at()
            )));
        }

        let record = ClientRecord {
            client_id: ticket.client_id.clone(),
            last_access: now.unix_secs(),
            status: RegistrationStatus::Active,
            valid_until: ticket.expires_at(),
        };
        put_json(ledger, &state_keys::client_record(&ticket.client_id), &record).await?;
        ledger
            .put(
                &state_keys::session_key(&ticket.client_id),
                ticket.session_key.as_bytes().to_vec(),
            )
            .await?;

        let audit = AuditRecord::new(ledger.tx_id(), now)
            .with_client(ticket.client_id.clone())
            .with_digest(sha256_hex(&ticket_json));
        put_json(
            ledger,
            &state_keys::registration_audit(&ticket.client_id, now.unix_secs()),
            &audit,
        )
        .await?;

        info!(client_id = %record.client_id, valid_until = record.valid_until, "client registered from TGT");
        Ok(record)
    }

    /// Whether a client holds a live registration; refreshes `last_access`
    ///
    /// Missing, lapsed, and non-active registrations all answer `false`
    /// rather than failing: this is the question, not an assertion.
    pub async fn check_registration_validity(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<bool> {
        let key = state_keys::client_record(client_id);
        let Some(mut record) = get_json::<ClientRecord>(ledger, &key).await? else {
            return Ok(false);
        };
        let now = ledger.tx_timestamp();
        if !record.is_valid(now) {
            debug!(client_id = %client_id, "registration lapsed");
            return Ok(false);
        }
        record.last_access = now.unix_secs();
        put_json(ledger, &key, &record).await?;
        Ok(true)
    }

    // =========================================================================
    // Service ticket minting
    // =========================================================================

    /// Exchange a TGT plus a live authenticator for a Service Ticket
    pub async fn generate_service_ticket(
        &self,
        ledger: &dyn LedgerState,
        request: &ServiceTicketRequest,
    ) -> Result<ServiceTicketResponse> {
        let now = ledger.tx_timestamp();

        // 1. Decrypt the TGT with the TGS private key.
        let (ticket, _) = self.decrypt_tgt(ledger, &request.encrypted_tgt).await?;

        // 2. The TGT must be for the requesting client.
        if ticket.client_id != request.client_id {
            return Err(TesseraError::mismatch(format!(
                "TGT names client {}, request names {}",
                ticket.client_id, request.client_id
            )));
        }

        // 3. The TGT must be live.
        if ticket.is_expired(now) {
            return Err(TesseraError::expired(format!(
                "TGT for client {} expired at {}",
                ticket.client_id,
                ticket.expires_at()
            )));
        }

        // 4. Verify the authenticator under the TGT session key, within the
        //    skew window, and unused.
        self.verify_authenticator(ledger, &ticket, &request.authenticator)
            .await?;

        // 5. The client must hold a live registration.
        if !self
            .check_registration_validity(ledger, &request.client_id)
            .await?
        {
            return Err(TesseraError::not_authorized(format!(
                "client {} has no live registration at the ticket-granting server",
                request.client_id
            )));
        }

        // 6-7. Mint the service ticket and wrap the new session key under
        //      the TGT session key the client already holds.
        let unix = now.unix_secs();
        let service_session_key =
            derive_session_key(request.client_id.as_str(), unix, LABEL_SERVICE_SESSION);
        let service_ticket = Ticket {
            client_id: request.client_id.clone(),
            session_key: service_session_key.clone(),
            timestamp: unix,
            lifetime_seconds: self.config.ticket_lifetime_secs,
        };
        let ticket_json = serde_json::to_vec(&service_ticket)?;
        let ticket_digest = sha256(&ticket_json);

        let isv_public = keyring::isv_public_key(ledger).await?;
        let encrypted_service_ticket = asymmetric::encrypt(
            &mut padding_rng(ledger.tx_id(), unix, &ticket_digest),
            &isv_public,
            &ticket_json,
        )?;

        let tgt_key = session_key_bytes(&ticket.session_key)?;
        let encrypted_session_key = envelope::seal_deterministic(
            &tgt_key,
            &[
                ledger.tx_id().as_bytes(),
                b"wrap-service-key",
                request.client_id.as_str().as_bytes(),
            ],
            service_session_key.as_bytes(),
        )?;

        // 8. Audit only after the mint succeeded.
        let audit = AuditRecord::new(ledger.tx_id(), now)
            .with_client(request.client_id.clone())
            .with_digest(sha256_hex(&ticket_json))
            .with_note(format!("service {}", request.service_id));
        put_json(
            ledger,
            &state_keys::ticket_audit(&request.client_id, &request.service_id, unix),
            &audit,
        )
        .await?;

        info!(
            client_id = %request.client_id,
            service_id = %request.service_id,
            "service ticket minted"
        );
        Ok(ServiceTicketResponse {
            encrypted_service_ticket: b64_encode(&encrypted_service_ticket),
            encrypted_session_key: b64_encode(&encrypted_session_key),
        })
    }

    /// Record that a service ticket was handed onward for the ISV
    ///
    /// Audit only; the ISV is invoked by the client holding the ticket,
    /// never synchronously from here.
    pub async fn forward_registration_to_isv(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
        service_id: &ServiceId,
        encrypted_service_ticket_b64: &str,
    ) -> Result<()> {
        let ciphertext = b64_decode(encrypted_service_ticket_b64)?;
        let now = ledger.tx_timestamp();
        let audit = AuditRecord::new(ledger.tx_id(), now)
            .with_client(client_id.clone())
            .with_digest(sha256_hex(&ciphertext))
            .with_note(format!("forwarded for service {service_id}"));
        put_json(
            ledger,
            &state_keys::forwarding_audit(client_id, service_id, now.unix_secs()),
            &audit,
        )
        .await?;
        debug!(client_id = %client_id, service_id = %service_id, "forwarding recorded");
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn decrypt_tgt(
        &self,
        ledger: &dyn LedgerState,
        encrypted_tgt_b64: &str,
    ) -> Result<(Ticket, Vec<u8>)> {
        let ciphertext = b64_decode(encrypted_tgt_b64)?;
        let private = keyring::private_key(ledger).await?;
        let ticket_json = asymmetric::decrypt(&private, &ciphertext)?;
        let ticket: Ticket = serde_json::from_slice(&ticket_json)
            .map_err(|e| TesseraError::invalid_input(format!("TGT payload: {e}")))?;
        Ok((ticket, ticket_json))
    }

    /// Open the authenticator, check its liveness window, and burn it
    async fn verify_authenticator(
        &self,
        ledger: &dyn LedgerState,
        ticket: &Ticket,
        authenticator_b64: &str,
    ) -> Result<()> {
        let sealed = b64_decode(authenticator_b64)?;
        let key = session_key_bytes(&ticket.session_key)?;
        let plaintext = envelope::open(&key, &sealed).map_err(|_| {
            TesseraError::decrypt_failed(format!(
                "authenticator for client {} does not open under the TGT session key",
                ticket.client_id
            ))
        })?;
        let authenticator: Authenticator = serde_json::from_slice(&plaintext)
            .map_err(|e| TesseraError::invalid_input(format!("authenticator payload: {e}")))?;

        if authenticator.client_id != ticket.client_id {
            return Err(TesseraError::mismatch(format!(
                "authenticator names client {}, TGT names {}",
                authenticator.client_id, ticket.client_id
            )));
        }

        let now = ledger.tx_timestamp().unix_secs();
        let skew = self.config.authenticator_skew_secs;
        if authenticator.timestamp.abs_diff(now) > skew {
            return Err(TesseraError::expired(format!(
                "authenticator timestamp {} outside the ±{skew}s window around {now}",
                authenticator.timestamp
            )));
        }

        let auth_hash = sha256_hex(&sealed);
        let used_key = state_keys::auth_used(&ticket.client_id, &auth_hash);
        if ledger.get(&used_key).await?.is_some() {
            warn!(client_id = %ticket.client_id, "authenticator replay detected");
            return Err(TesseraError::replay(format!(
                "authenticator for client {} was already used",
                ticket.client_id
            )));
        }
        let marker = AuditRecord::new(ledger.tx_id(), ledger.tx_timestamp())
            .with_client(ticket.client_id.clone())
            .with_digest(auth_hash);
        put_json(ledger, &used_key, &marker).await?;
        Ok(())
    }
}
