//! Records owned by the Ticket-Granting Server

use serde::{Deserialize, Serialize};
use tessera_core::{ClientId, TxTimestamp};

/// Registration status of a client at the TGS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// Client may request service tickets
    #[serde(rename = "active")]
    Active,
    /// Registration administratively withdrawn
    #[serde(rename = "revoked")]
    Revoked,
}

/// A client registration derived from an accepted TGT (`CLIENT_RECORD_<id>`)
///
/// `valid_until` always equals the accepted TGT's `timestamp + lifetime`;
/// the registration dies with the ticket that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Registered client
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Unix second of the last operation that touched this registration
    #[serde(rename = "lastAccess")]
    pub last_access: u64,
    /// Registration status
    #[serde(rename = "status")]
    pub status: RegistrationStatus,
    /// Unix second the registration lapses
    #[serde(rename = "validUntil")]
    pub valid_until: u64,
}

impl ClientRecord {
    /// Whether the registration is live at `now`
    pub fn is_valid(&self, now: TxTimestamp) -> bool {
        self.status == RegistrationStatus::Active && !now.is_after(self.valid_until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(valid_until: u64, status: RegistrationStatus) -> ClientRecord {
        ClientRecord {
            client_id: ClientId::new("c1").unwrap(),
            last_access: 0,
            status,
            valid_until,
        }
    }

    #[test]
    fn test_validity_window() {
        let r = record(1_000, RegistrationStatus::Active);
        assert!(r.is_valid(TxTimestamp::from_secs(1_000)));
        assert!(!r.is_valid(TxTimestamp::from_secs(1_001)));
    }

    #[test]
    fn test_revoked_is_never_valid() {
        let r = record(u64::MAX, RegistrationStatus::Revoked);
        assert!(!r.is_valid(TxTimestamp::from_secs(0)));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&RegistrationStatus::Active).unwrap(),
            "\"active\""
        );
    }
}
