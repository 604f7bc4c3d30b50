//! Tickets and audit records
//!
//! A [`Ticket`] is the time-bounded credential minted by the AS (as a TGT,
//! encrypted for the TGS) and by the TGS (as a Service Ticket, encrypted for
//! the ISV). Both hops carry the same shape: the ticket travels as
//! ciphertext only and is self-verifying once decrypted.
//!
//! An [`AuditRecord`] is the JSON body written under the audit keys of
//! `state_keys` after a state-changing operation succeeds. Audit entries are
//! written last on the success path, so their presence implies the operation
//! committed.

use crate::identifiers::ClientId;
use crate::time::TxTimestamp;
use serde::{Deserialize, Serialize};

/// Default lifetime of TGTs and Service Tickets, in seconds
pub const DEFAULT_TICKET_LIFETIME_SECS: u64 = 3_600;

/// A time-bounded credential bound to the next hop by encryption
///
/// The `session_key` inside a TGT is the client-TGS key (`KU,TGS`); inside a
/// Service Ticket it is the client-service key (`KU,SS`). Session keys are
/// conveyed as base64 of a 32-byte derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Client the ticket was minted for
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Symmetric session key shared with the client for the ticket's life
    #[serde(rename = "sessionKey")]
    pub session_key: String,
    /// Mint time in unix seconds (the minting transaction's timestamp)
    #[serde(rename = "timestamp")]
    pub timestamp: u64,
    /// Validity window starting at `timestamp`
    #[serde(rename = "lifetimeSeconds")]
    pub lifetime_seconds: u64,
}

impl Ticket {
    /// Unix second at which the ticket stops being valid
    pub fn expires_at(&self) -> u64 {
        self.timestamp.saturating_add(self.lifetime_seconds)
    }

    /// Whether the ticket is expired at the given transaction time
    pub fn is_expired(&self, now: TxTimestamp) -> bool {
        now.is_after(self.expires_at())
    }
}

/// Body of an audit entry
///
/// Every audit record carries the acting transaction's id and timestamp.
/// `digest_sha256` is the hex SHA-256 of whatever payload the operation
/// minted or accepted (TGT JSON, service ticket ciphertext, response
/// payload); `note` records small non-secret facts such as a status
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Transaction id of the operation that wrote this entry
    #[serde(rename = "txID")]
    pub tx_id: String,
    /// Transaction timestamp in unix seconds
    #[serde(rename = "timestamp")]
    pub timestamp: u64,
    /// Acting client, when the operation concerns one
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Hex SHA-256 of the operation's payload
    #[serde(rename = "digestSHA256", skip_serializing_if = "Option::is_none")]
    pub digest_sha256: Option<String>,
    /// Short non-secret annotation
    #[serde(rename = "note", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AuditRecord {
    /// Start an audit record for the acting transaction
    pub fn new(tx_id: impl Into<String>, now: TxTimestamp) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp: now.unix_secs(),
            client_id: None,
            digest_sha256: None,
            note: None,
        }
    }

    /// Attach the acting client
    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Attach a payload digest
    pub fn with_digest(mut self, digest_hex: impl Into<String>) -> Self {
        self.digest_sha256 = Some(digest_hex.into());
        self
    }

    /// Attach a short annotation
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
