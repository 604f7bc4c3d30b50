//! Records owned by the IoT Service Validator

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{ClientId, DeviceId, SessionId, TxTimestamp};

/// Operational state of a registered device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Available for sessions
    #[serde(rename = "active")]
    Active,
    /// Administratively offline
    #[serde(rename = "inactive")]
    Inactive,
    /// Serving an active session
    #[serde(rename = "busy")]
    Busy,
}

impl DeviceStatus {
    /// Wire string, also the form bound into status-update signatures
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered IoT device (`DEVICE_<id>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoTDevice {
    /// The device's identifier
    #[serde(rename = "deviceID")]
    pub device_id: DeviceId,
    /// The device's RSA public key as PEM
    #[serde(rename = "publicKeyPEM")]
    pub public_key_pem: String,
    /// Operational state
    #[serde(rename = "status")]
    pub status: DeviceStatus,
    /// Unix second of the last signed contact from the device
    #[serde(rename = "lastSeen")]
    pub last_seen: u64,
    /// Unix second of registration
    #[serde(rename = "registeredAt")]
    pub registered_at: u64,
    /// Capability tags, e.g. `temperature`
    #[serde(rename = "capabilities")]
    pub capabilities: Vec<String>,
}

/// Lifecycle state of a client-device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Session is live
    #[serde(rename = "active")]
    Active,
    /// Session was closed or lapsed
    #[serde(rename = "terminated")]
    Terminated,
}

/// A bounded client-device session (`SESSION_<client>_<device>_<unix>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDeviceSession {
    /// Session identifier (also the record's ledger key)
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Client holding the session
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Device serving the session
    #[serde(rename = "deviceID")]
    pub device_id: DeviceId,
    /// Service session key shared with the client
    #[serde(rename = "sessionKey")]
    pub session_key: String,
    /// Unix second the session was granted
    #[serde(rename = "establishedAt")]
    pub established_at: u64,
    /// Unix second the session lapses
    #[serde(rename = "expiresAt")]
    pub expires_at: u64,
    /// Lifecycle state
    #[serde(rename = "status")]
    pub status: SessionStatus,
}

impl ClientDeviceSession {
    /// Whether the stored record is past its expiry at `now`
    pub fn is_expired(&self, now: TxTimestamp) -> bool {
        now.is_after(self.expires_at)
    }

    /// Whether the session is live: active and unexpired
    pub fn is_live(&self, now: TxTimestamp) -> bool {
        self.status == SessionStatus::Active && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: SessionStatus, expires_at: u64) -> ClientDeviceSession {
        let client = ClientId::new("c1").unwrap();
        let device = DeviceId::new("d1").unwrap();
        ClientDeviceSession {
            session_id: SessionId::derive(&client, &device, 100),
            client_id: client,
            device_id: device,
            session_key: "k".into(),
            established_at: 100,
            expires_at,
            status,
        }
    }

    #[test]
    fn test_liveness_requires_active_and_unexpired() {
        let live = session(SessionStatus::Active, 1_000);
        assert!(live.is_live(TxTimestamp::from_secs(1_000)));
        assert!(!live.is_live(TxTimestamp::from_secs(1_001)));
        let closed = session(SessionStatus::Terminated, 1_000);
        assert!(!closed.is_live(TxTimestamp::from_secs(500)));
    }

    #[test]
    fn test_device_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&DeviceStatus::Busy).unwrap(),
            "\"busy\""
        );
        assert_eq!(DeviceStatus::Inactive.as_str(), "inactive");
    }
}
