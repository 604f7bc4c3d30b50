//! # Tessera Testkit
//!
//! Shared fixtures for exercising the three ticket servers together:
//!
//! - [`keys`]: one lazily generated, seeded set of 2048-bit RSA keypairs,
//!   so the expensive generation happens once per test binary
//! - [`ScriptedLedger`]: a [`MemoryLedger`] with a scripted clock and a
//!   deterministic transaction-id sequence, standing in for the ordering
//!   layer
//! - [`Harness`]: the three servers over one shared ledger, plus helpers
//!   that walk a client through the full AS → TGS → ISV flow one
//!   transaction per operation, the way real callers do
//!
//! Everything here is deterministic except where a helper explicitly says
//! otherwise (client-side authenticator nonces).

#![forbid(unsafe_code)]

pub mod keys;

use std::sync::atomic::{AtomicU64, Ordering};
use tessera_as::{AuthServer, AuthServerConfig};
use tessera_client::ClientCredentials;
use tessera_core::wire::{
    ServiceRequest, ServiceResponse, ServiceTicketRequest, ServiceTicketResponse, TgtResponse,
};
use tessera_core::{ClientId, DeviceId, Result, ServiceId, SessionId, TxTimestamp};
use tessera_isv::{IoTDevice, ServiceValidator, ServiceValidatorConfig};
use tessera_ledger::{LedgerTransaction, MemoryLedger};
use tessera_tgs::{ClientRecord, TicketGrantingServer, TicketGrantingServerConfig};

/// A memory ledger with a scripted clock and transaction-id sequence
pub struct ScriptedLedger {
    ledger: MemoryLedger,
    time_secs: AtomicU64,
    tx_seq: AtomicU64,
}

impl ScriptedLedger {
    /// Start the clock at the given unix second
    pub fn starting_at(secs: u64) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            time_secs: AtomicU64::new(secs),
            tx_seq: AtomicU64::new(0),
        }
    }

    /// Current scripted time in unix seconds
    pub fn now(&self) -> u64 {
        self.time_secs.load(Ordering::SeqCst)
    }

    /// Advance the scripted clock
    pub fn advance(&self, secs: u64) {
        self.time_secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Begin a transaction at the current time with the next id in the
    /// `tx-<n>` sequence
    pub fn tx(&self) -> LedgerTransaction {
        let seq = self.tx_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.ledger
            .begin(TxTimestamp::from_secs(self.now()), format!("tx-{seq}"))
    }

    /// Committed state as ordered key-value pairs
    pub fn dump(&self) -> Vec<(String, Vec<u8>)> {
        self.ledger.dump()
    }

    /// Point-read committed state
    pub fn get_committed(&self, key: &str) -> Option<Vec<u8>> {
        self.ledger.get_committed(key)
    }
}

/// The three ticket servers over one shared scripted ledger
pub struct Harness {
    /// The shared ledger
    pub ledger: ScriptedLedger,
    /// Authentication server
    pub auth: AuthServer,
    /// Ticket-granting server
    pub tgs: TicketGrantingServer,
    /// Service validator
    pub isv: ServiceValidator,
}

impl Harness {
    /// Initialize all three components on a fresh ledger at t = `start_secs`
    pub async fn bootstrap(start_secs: u64) -> Result<Self> {
        let harness = Self {
            ledger: ScriptedLedger::starting_at(start_secs),
            auth: AuthServer::with_config(AuthServerConfig::default()),
            tgs: TicketGrantingServer::with_config(TicketGrantingServerConfig::default()),
            isv: ServiceValidator::with_config(ServiceValidatorConfig::default()),
        };
        let fixture = keys::test_keys();

        let tx = harness.ledger.tx();
        harness
            .auth
            .initialize(&tx, &fixture.as_private_pem, &fixture.as_public_pem)
            .await?;
        tx.commit()?;

        let tx = harness.ledger.tx();
        harness
            .tgs
            .initialize(&tx, &fixture.tgs_private_pem, &fixture.tgs_public_pem)
            .await?;
        tx.commit()?;

        let tx = harness.ledger.tx();
        harness
            .isv
            .initialize(&tx, &fixture.isv_private_pem, &fixture.isv_public_pem)
            .await?;
        tx.commit()?;

        Ok(harness)
    }

    /// Register a client and walk it through a signature verification
    pub async fn register_and_verify(&self, creds: &ClientCredentials) -> Result<()> {
        let tx = self.ledger.tx();
        self.auth
            .register_client(&tx, &creds.client_id, &creds.public_key_pem()?)
            .await?;
        tx.commit()?;

        let tx = self.ledger.tx();
        let challenge = self
            .auth
            .initiate_authentication(&tx, &creds.client_id)
            .await?;
        tx.commit()?;

        let tx = self.ledger.tx();
        self.auth
            .verify_client_identity_with_signature(
                &tx,
                &creds.client_id,
                &creds.sign_challenge(&challenge.nonce)?,
            )
            .await?;
        tx.commit()?;
        Ok(())
    }

    /// Mint a TGT for a registered client
    pub async fn obtain_tgt(&self, client_id: &ClientId) -> Result<TgtResponse> {
        let tx = self.ledger.tx();
        let response = self.auth.generate_tgt(&tx, client_id).await?;
        tx.commit()?;
        Ok(response)
    }

    /// Present a TGT to the TGS and record the registration
    pub async fn register_at_tgs(&self, tgt: &TgtResponse) -> Result<ClientRecord> {
        let tx = self.ledger.tx();
        let record = self
            .tgs
            .process_registration_from_as(&tx, &tgt.encrypted_tgt)
            .await?;
        tx.commit()?;
        Ok(record)
    }

    /// Exchange a TGT for a service ticket using a caller-built authenticator
    pub async fn exchange_tgt(
        &self,
        client_id: &ClientId,
        service_id: &ServiceId,
        tgt: &TgtResponse,
        authenticator: String,
    ) -> Result<ServiceTicketResponse> {
        let request = ServiceTicketRequest {
            encrypted_tgt: tgt.encrypted_tgt.clone(),
            client_id: client_id.clone(),
            service_id: service_id.clone(),
            authenticator,
        };
        let tx = self.ledger.tx();
        let response = self.tgs.generate_service_ticket(&tx, &request).await?;
        tx.commit()?;
        Ok(response)
    }

    /// Exchange a TGT for a service ticket, building the authenticator from
    /// the client credentials (random AEAD nonce; not for replay tests that
    /// compare ledgers)
    pub async fn obtain_service_ticket(
        &self,
        creds: &ClientCredentials,
        service_id: &ServiceId,
        tgt: &TgtResponse,
    ) -> Result<(ServiceTicketResponse, String)> {
        let tgt_session_key = creds.unwrap_tgt_session_key(&tgt.encrypted_session_key)?;
        let authenticator = creds.build_authenticator(&tgt_session_key, self.ledger.now())?;
        let response = self
            .exchange_tgt(&creds.client_id, service_id, tgt, authenticator)
            .await?;
        Ok((response, tgt_session_key))
    }

    /// Register a device from the shared fixture keys
    pub async fn register_device(
        &self,
        device_id: &DeviceId,
        capabilities: Vec<String>,
    ) -> Result<IoTDevice> {
        let fixture = keys::test_keys();
        let tx = self.ledger.tx();
        let device = self
            .isv
            .register_iot_device(&tx, device_id, &fixture.device_public_pem, capabilities)
            .await?;
        tx.commit()?;
        Ok(device)
    }

    /// Submit a service request against a device
    pub async fn request_session(
        &self,
        client_id: &ClientId,
        device_id: &DeviceId,
        ticket: &ServiceTicketResponse,
        request_type: &str,
    ) -> Result<ServiceResponse> {
        let request = ServiceRequest {
            encrypted_service_ticket: ticket.encrypted_service_ticket.clone(),
            client_id: client_id.clone(),
            device_id: device_id.clone(),
            request_type: request_type.to_string(),
            encrypted_data: String::new(),
        };
        let tx = self.ledger.tx();
        let response = self.isv.process_service_request(&tx, &request).await?;
        tx.commit()?;
        Ok(response)
    }

    /// Close a session
    pub async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        let tx = self.ledger.tx();
        self.isv.close_session(&tx, session_id).await?;
        tx.commit()?;
        Ok(())
    }
}
