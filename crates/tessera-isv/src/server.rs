//! IoT Service Validator operations
//!
//! Sessions are bounded in time and exclusive per (client, device): while a
//! session is active the device is `busy`, and a device is only ever `busy`
//! because exactly one active session names it. The commit-time read-set
//! check of the ledger turns two concurrent grants for one device into a
//! conflict for the later one.

use crate::keyring;
use crate::records::{ClientDeviceSession, DeviceStatus, IoTDevice, SessionStatus};
use serde::{Deserialize, Serialize};
use tessera_core::ticket::DEFAULT_TICKET_LIFETIME_SECS;
use tessera_core::wire::{GrantStatus, ServiceRequest, ServiceResponse};
use tessera_core::{
    state_keys, AuditRecord, ClientId, DeviceId, Result, SessionId, TesseraError, Ticket,
};
use tessera_crypto::derive::{session_key_bytes, sha256, sha256_hex};
use tessera_crypto::encoding::{b64_decode, b64_encode};
use tessera_crypto::{asymmetric, envelope, pem};
use tessera_ledger::codec::{get_json, put_json, require_json};
use tessera_ledger::LedgerState;
use tracing::{debug, info, warn};

/// Service Validator policy knobs
#[derive(Debug, Clone)]
pub struct ServiceValidatorConfig {
    /// Lifetime of granted sessions in seconds
    pub session_lifetime_secs: u64,
}

impl Default for ServiceValidatorConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: DEFAULT_TICKET_LIFETIME_SECS,
        }
    }
}

/// Device response appended to an active session (`RESPONSE_<session>_<unix>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Session the response belongs to
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Device payload, base64
    #[serde(rename = "payload")]
    pub payload: String,
    /// Transaction that appended the record
    #[serde(rename = "txID")]
    pub tx_id: String,
    /// Transaction timestamp in unix seconds
    #[serde(rename = "timestamp")]
    pub timestamp: u64,
}

/// Payload sealed under the service session key on a granted request
#[derive(Serialize)]
struct GrantPayload<'a> {
    #[serde(rename = "sessionID")]
    session_id: &'a str,
    #[serde(rename = "deviceID")]
    device_id: &'a str,
    #[serde(rename = "requestType")]
    request_type: &'a str,
    #[serde(rename = "grantedAt")]
    granted_at: u64,
    #[serde(rename = "capabilities")]
    capabilities: &'a [String],
}

/// The IoT Service Validator
#[derive(Debug, Clone, Default)]
pub struct ServiceValidator {
    config: ServiceValidatorConfig,
}

impl ServiceValidator {
    /// Create a validator with default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom policy
    pub fn with_config(config: ServiceValidatorConfig) -> Self {
        Self { config }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Seed the ISV keypair into the ledger (one-shot)
    pub async fn initialize(
        &self,
        ledger: &dyn LedgerState,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<()> {
        if ledger.get(state_keys::ISV_PUBLIC_KEY).await?.is_some() {
            return Err(TesseraError::already_exists(
                "service validator keypair is already seeded",
            ));
        }
        let private = pem::parse_private_key(private_key_pem)?;
        let public = pem::parse_public_key(public_key_pem)?;
        if rsa::RsaPublicKey::from(&private) != public {
            return Err(TesseraError::invalid_input(
                "public key does not match private key",
            ));
        }
        ledger
            .put(
                state_keys::ISV_PRIVATE_KEY,
                private_key_pem.as_bytes().to_vec(),
            )
            .await?;
        ledger
            .put(
                state_keys::ISV_PUBLIC_KEY,
                public_key_pem.as_bytes().to_vec(),
            )
            .await?;
        info!("service validator initialized");
        Ok(())
    }

    // =========================================================================
    // Device registry
    // =========================================================================

    /// Register an IoT device with its public key and capability tags
    pub async fn register_iot_device(
        &self,
        ledger: &dyn LedgerState,
        device_id: &DeviceId,
        public_key_pem: &str,
        capabilities: Vec<String>,
    ) -> Result<IoTDevice> {
        let key = state_keys::device(device_id);
        if ledger.get(&key).await?.is_some() {
            return Err(TesseraError::already_exists(format!(
                "device {device_id} is already registered"
            )));
        }
        pem::parse_public_key(public_key_pem)?;

        let now = ledger.tx_timestamp();
        let device = IoTDevice {
            device_id: device_id.clone(),
            public_key_pem: public_key_pem.to_string(),
            status: DeviceStatus::Active,
            last_seen: now.unix_secs(),
            registered_at: now.unix_secs(),
            capabilities,
        };
        put_json(ledger, &key, &device).await?;

        let audit = AuditRecord::new(ledger.tx_id(), now).with_note("device registered");
        put_json(
            ledger,
            &state_keys::device_registration_audit(device_id, now.unix_secs()),
            &audit,
        )
        .await?;
        info!(device_id = %device_id, "device registered");
        Ok(device)
    }

    /// Apply a device-signed status update
    ///
    /// The signature covers `deviceID ‖ newStatus ‖ ⌊now/60⌋`, binding the
    /// update to the device, the target state, and the current minute.
    /// `busy` is session-managed and cannot be claimed by a device, and a
    /// device serving an active session cannot change state out from under
    /// it; a busy device only leaves `busy` through session close or
    /// expiry.
    pub async fn update_device_status(
        &self,
        ledger: &dyn LedgerState,
        device_id: &DeviceId,
        new_status: DeviceStatus,
        signature_b64: &str,
    ) -> Result<IoTDevice> {
        if new_status == DeviceStatus::Busy {
            return Err(TesseraError::invalid_input(
                "busy is set by session grants, not by status updates",
            ));
        }
        let key = state_keys::device(device_id);
        let mut device: IoTDevice = require_json(ledger, &key).await?;
        if device.status == DeviceStatus::Busy {
            return Err(TesseraError::conflict(format!(
                "device {device_id} is serving an active session"
            )));
        }

        let now = ledger.tx_timestamp();
        let message = format!(
            "{device_id}{}{}",
            new_status.as_str(),
            now.minute_bucket()
        );
        let digest = sha256(message.as_bytes());
        let signature = b64_decode(signature_b64)?;
        let public = pem::parse_public_key(&device.public_key_pem)?;
        asymmetric::verify_digest(&public, &digest, &signature).map_err(|_| {
            TesseraError::signature_invalid(format!(
                "status update signature for device {device_id} rejected"
            ))
        })?;

        let old_status = device.status;
        device.status = new_status;
        device.last_seen = now.unix_secs();
        put_json(ledger, &key, &device).await?;

        let audit = AuditRecord::new(ledger.tx_id(), now)
            .with_note(format!("status {old_status} -> {new_status}"));
        put_json(
            ledger,
            &state_keys::device_status_audit(device_id, now.unix_secs()),
            &audit,
        )
        .await?;
        info!(device_id = %device_id, status = %new_status, "device status updated");
        Ok(device)
    }

    /// Whether the device is in the `active` state
    pub async fn check_device_availability(
        &self,
        ledger: &dyn LedgerState,
        device_id: &DeviceId,
    ) -> Result<bool> {
        let device: IoTDevice = require_json(ledger, &state_keys::device(device_id)).await?;
        Ok(device.status == DeviceStatus::Active)
    }

    /// Read back a device record
    pub async fn get_iot_device(
        &self,
        ledger: &dyn LedgerState,
        device_id: &DeviceId,
    ) -> Result<IoTDevice> {
        require_json(ledger, &state_keys::device(device_id)).await
    }

    /// All registered devices, in id order
    pub async fn get_all_iot_devices(&self, ledger: &dyn LedgerState) -> Result<Vec<IoTDevice>> {
        let (start, end) = state_keys::prefix_range(state_keys::DEVICE_PREFIX);
        let rows = ledger.range_scan(&start, &end).await?;
        let mut devices = Vec::new();
        for (key, bytes) in rows {
            // DEVICE_REG_* and DEVICE_STATUS_* audit keys share the prefix.
            if key.starts_with(state_keys::DEVICE_REG_PREFIX)
                || key.starts_with(state_keys::DEVICE_STATUS_PREFIX)
            {
                continue;
            }
            let device: IoTDevice = serde_json::from_slice(&bytes)
                .map_err(|e| TesseraError::internal(format!("corrupt record at {key}: {e}")))?;
            devices.push(device);
        }
        Ok(devices)
    }

    // =========================================================================
    // Ticket validation and sessions
    // =========================================================================

    /// Decrypt and validate a Service Ticket, retaining its session key
    pub async fn validate_service_ticket(
        &self,
        ledger: &dyn LedgerState,
        encrypted_service_ticket_b64: &str,
    ) -> Result<Ticket> {
        let ciphertext = b64_decode(encrypted_service_ticket_b64)?;
        let private = keyring::private_key(ledger).await?;
        let ticket_json = asymmetric::decrypt(&private, &ciphertext)?;
        let ticket: Ticket = serde_json::from_slice(&ticket_json)
            .map_err(|e| TesseraError::invalid_input(format!("service ticket payload: {e}")))?;

        let now = ledger.tx_timestamp();
        if ticket.is_expired(now) {
            return Err(TesseraError::expired(format!(
                "service ticket for client {} expired at {}",
                ticket.client_id,
                ticket.expires_at()
            )));
        }

        ledger
            .put(
                &state_keys::session_key(&ticket.client_id),
                ticket.session_key.as_bytes().to_vec(),
            )
            .await?;
        debug!(client_id = %ticket.client_id, "service ticket validated");
        Ok(ticket)
    }

    /// Grant a bounded session against a device
    ///
    /// An unavailable device answers with `device_unavailable` and no new
    /// session. Finding a live session for the same (client, device) pair
    /// while the device reads `active` is an invariant breach and fails
    /// `Conflict`; concurrent grants for one device collide on the device
    /// record at commit instead.
    pub async fn process_service_request(
        &self,
        ledger: &dyn LedgerState,
        request: &ServiceRequest,
    ) -> Result<ServiceResponse> {
        let ticket = self
            .validate_service_ticket(ledger, &request.encrypted_service_ticket)
            .await?;
        if ticket.client_id != request.client_id {
            return Err(TesseraError::mismatch(format!(
                "service ticket names client {}, request names {}",
                ticket.client_id, request.client_id
            )));
        }

        let now = ledger.tx_timestamp();
        // Lazy expiry for this pair's sessions before judging availability.
        let live_pair_sessions = self
            .reap_pair_sessions(ledger, &request.client_id, &request.device_id)
            .await?;

        let device_key = state_keys::device(&request.device_id);
        let mut device: IoTDevice = require_json(ledger, &device_key).await?;
        if device.status != DeviceStatus::Active {
            debug!(device_id = %request.device_id, status = %device.status, "device unavailable");
            return Ok(ServiceResponse::refused(
                request.client_id.clone(),
                request.device_id.clone(),
                GrantStatus::DeviceUnavailable,
            ));
        }
        if live_pair_sessions > 0 {
            return Err(TesseraError::conflict(format!(
                "client {} already holds an active session on device {}",
                request.client_id, request.device_id
            )));
        }

        let unix = now.unix_secs();
        let session_id = SessionId::derive(&request.client_id, &request.device_id, unix);
        let session = ClientDeviceSession {
            session_id: session_id.clone(),
            client_id: request.client_id.clone(),
            device_id: request.device_id.clone(),
            session_key: ticket.session_key.clone(),
            established_at: unix,
            expires_at: unix + self.config.session_lifetime_secs,
            status: SessionStatus::Active,
        };
        put_json(ledger, session_id.as_str(), &session).await?;

        device.status = DeviceStatus::Busy;
        put_json(ledger, &device_key, &device).await?;

        let payload = GrantPayload {
            session_id: session_id.as_str(),
            device_id: request.device_id.as_str(),
            request_type: &request.request_type,
            granted_at: unix,
            capabilities: &device.capabilities,
        };
        let payload_json = serde_json::to_vec(&payload)?;
        let key = session_key_bytes(&ticket.session_key)?;
        let sealed = envelope::seal_deterministic(
            &key,
            &[
                ledger.tx_id().as_bytes(),
                b"service-grant",
                session_id.as_str().as_bytes(),
            ],
            &payload_json,
        )?;

        let audit = AuditRecord::new(ledger.tx_id(), now)
            .with_client(request.client_id.clone())
            .with_digest(sha256_hex(&sealed))
            .with_note(format!("{} on {}", request.request_type, request.device_id));
        put_json(
            ledger,
            &state_keys::service_grant_audit(&request.client_id, &request.device_id, unix),
            &audit,
        )
        .await?;

        info!(
            client_id = %request.client_id,
            device_id = %request.device_id,
            session_id = %session_id,
            "service request granted"
        );
        Ok(ServiceResponse::granted(
            request.client_id.clone(),
            request.device_id.clone(),
            &session_id,
            b64_encode(&sealed),
        ))
    }

    /// Append a device payload to an active session
    pub async fn handle_device_response(
        &self,
        ledger: &dyn LedgerState,
        session_id: &SessionId,
        payload: &[u8],
    ) -> Result<()> {
        let mut session: ClientDeviceSession = require_json(ledger, session_id.as_str()).await?;
        let now = ledger.tx_timestamp();

        if session.status == SessionStatus::Terminated {
            return Err(TesseraError::not_authorized(format!(
                "session {session_id} is terminated"
            )));
        }
        if session.is_expired(now) {
            self.terminate(ledger, &mut session).await?;
            return Err(TesseraError::expired(format!(
                "session {session_id} expired at {}",
                session.expires_at
            )));
        }

        let record = ResponseRecord {
            session_id: session_id.clone(),
            payload: b64_encode(payload),
            tx_id: ledger.tx_id().to_string(),
            timestamp: now.unix_secs(),
        };
        put_json(
            ledger,
            &state_keys::response_audit(session_id, now.unix_secs()),
            &record,
        )
        .await?;
        debug!(session_id = %session_id, "device response recorded");
        Ok(())
    }

    /// Close a session and return its device to `active`
    ///
    /// Idempotent: closing an already-terminated session is a no-op
    /// success.
    pub async fn close_session(
        &self,
        ledger: &dyn LedgerState,
        session_id: &SessionId,
    ) -> Result<ClientDeviceSession> {
        let mut session: ClientDeviceSession = require_json(ledger, session_id.as_str()).await?;
        if session.status == SessionStatus::Terminated {
            return Ok(session);
        }
        self.terminate(ledger, &mut session).await?;
        info!(session_id = %session_id, "session closed");
        Ok(session)
    }

    /// Live sessions held by a client, in key order
    pub async fn get_active_sessions_by_client(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
    ) -> Result<Vec<ClientDeviceSession>> {
        let prefix = state_keys::session_prefix_for_client(client_id);
        let (start, end) = state_keys::prefix_range(&prefix);
        let rows = ledger.range_scan(&start, &end).await?;
        let now = ledger.tx_timestamp();
        let mut sessions = Vec::new();
        for (key, bytes) in rows {
            // A client literally named KEY makes this prefix overlap the
            // SESSION_KEY_* records; session keys have a <device>_<unix>
            // tail after the prefix, which those records never do.
            let tail = &key[prefix.len()..];
            let mut parts = tail.split('_');
            let device_part = parts.next().unwrap_or_default();
            let unix_part = parts.next().unwrap_or_default();
            if parts.next().is_some()
                || device_part.is_empty()
                || !unix_part.chars().all(|c| c.is_ascii_digit())
                || unix_part.is_empty()
            {
                continue;
            }
            let session: ClientDeviceSession = serde_json::from_slice(&bytes)
                .map_err(|e| TesseraError::internal(format!("corrupt record at {key}: {e}")))?;
            if session.is_live(now) {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Raw audit entries under a key prefix, for operators
    pub async fn get_audit_trail(
        &self,
        ledger: &dyn LedgerState,
        prefix: &str,
    ) -> Result<Vec<(String, serde_json::Value)>> {
        let (start, end) = state_keys::prefix_range(prefix);
        let rows = ledger.range_scan(&start, &end).await?;
        let mut entries = Vec::new();
        for (key, bytes) in rows {
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|e| TesseraError::internal(format!("corrupt record at {key}: {e}")))?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Terminate a session and release its device if busy
    async fn terminate(
        &self,
        ledger: &dyn LedgerState,
        session: &mut ClientDeviceSession,
    ) -> Result<()> {
        session.status = SessionStatus::Terminated;
        put_json(ledger, session.session_id.as_str(), session).await?;

        let device_key = state_keys::device(&session.device_id);
        let device: Option<IoTDevice> = get_json(ledger, &device_key).await?;
        match device {
            Some(mut device) if device.status == DeviceStatus::Busy => {
                device.status = DeviceStatus::Active;
                put_json(ledger, &device_key, &device).await?;
            }
            Some(_) => {}
            None => {
                warn!(
                    session_id = %session.session_id,
                    device_id = %session.device_id,
                    "terminating session whose device record is gone"
                );
            }
        }
        Ok(())
    }

    /// Apply lazy expiry to this pair's sessions; count the live remainder
    async fn reap_pair_sessions(
        &self,
        ledger: &dyn LedgerState,
        client_id: &ClientId,
        device_id: &DeviceId,
    ) -> Result<usize> {
        let prefix = format!("SESSION_{client_id}_{device_id}_");
        let (start, end) = state_keys::prefix_range(&prefix);
        let rows = ledger.range_scan(&start, &end).await?;
        let now = ledger.tx_timestamp();
        let mut live = 0usize;
        for (key, bytes) in rows {
            let mut session: ClientDeviceSession = serde_json::from_slice(&bytes)
                .map_err(|e| TesseraError::internal(format!("corrupt record at {key}: {e}")))?;
            if session.status == SessionStatus::Active {
                if session.is_expired(now) {
                    debug!(session_id = %session.session_id, "reaping expired session");
                    self.terminate(ledger, &mut session).await?;
                } else {
                    live += 1;
                }
            }
        }
        Ok(live)
    }
}
