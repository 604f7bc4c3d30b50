//! Wire payloads exchanged with clients
//!
//! All structured payloads are UTF-8 JSON with the field names pinned here;
//! all ciphertexts and signatures on the wire are base64 (standard alphabet,
//! padded). Requests are plain JSON; the base64 layer applies to the
//! embedded ciphertexts only, never to the surrounding document.

use crate::identifiers::{ClientId, DeviceId, ServiceId, SessionId};
use serde::{Deserialize, Serialize};

/// Challenge returned by `InitiateAuthentication`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceChallenge {
    /// Base64 nonce the client must prove possession over
    #[serde(rename = "nonce")]
    pub nonce: String,
    /// Unix second after which the challenge is dead
    #[serde(rename = "expirationTime")]
    pub expiration_time: u64,
}

/// Response of `GenerateTGT` to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgtResponse {
    /// TGT ciphertext, encrypted under the TGS public key
    #[serde(rename = "encryptedTGT")]
    pub encrypted_tgt: String,
    /// Client-TGS session key, encrypted under the client public key
    #[serde(rename = "encryptedSessionKey")]
    pub encrypted_session_key: String,
}

/// Request submitted to `GenerateServiceTicket`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTicketRequest {
    /// TGT ciphertext as returned by the AS
    #[serde(rename = "encryptedTGT")]
    pub encrypted_tgt: String,
    /// Client claiming the ticket
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Service the ticket is requested for
    #[serde(rename = "serviceID")]
    pub service_id: ServiceId,
    /// Liveness proof under the TGT session key
    #[serde(rename = "authenticator")]
    pub authenticator: String,
}

/// Response of `GenerateServiceTicket`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTicketResponse {
    /// Service ticket ciphertext, encrypted under the ISV public key
    #[serde(rename = "encryptedServiceTicket")]
    pub encrypted_service_ticket: String,
    /// Client-service session key, wrapped under the TGT session key
    #[serde(rename = "encryptedSessionKey")]
    pub encrypted_session_key: String,
}

/// Request submitted to `ProcessServiceRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Service ticket ciphertext as returned by the TGS
    #[serde(rename = "encryptedServiceTicket")]
    pub encrypted_service_ticket: String,
    /// Client claiming the session
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Device the session is requested against
    #[serde(rename = "deviceID")]
    pub device_id: DeviceId,
    /// Operation the client intends, e.g. `read`
    #[serde(rename = "requestType")]
    pub request_type: String,
    /// Optional request payload under the service session key
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
}

/// Plaintext of an authenticator, sealed under the TGT session key
///
/// The wire form is the base64 of the AES-256-GCM envelope over this JSON;
/// the envelope is the only base64 layer; the surrounding request stays
/// plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticator {
    /// Client proving liveness
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Client-side unix seconds at construction; must land within the
    /// TGS's acceptance window
    #[serde(rename = "timestamp")]
    pub timestamp: u64,
}

/// Outcome of a service request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantStatus {
    /// Session established
    #[serde(rename = "granted")]
    Granted,
    /// Request refused
    #[serde(rename = "denied")]
    Denied,
    /// Target device is not in the `active` state
    #[serde(rename = "device_unavailable")]
    DeviceUnavailable,
}

/// Response of `ProcessServiceRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    /// Client the response addresses
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Device the request targeted
    #[serde(rename = "deviceID")]
    pub device_id: DeviceId,
    /// Grant outcome
    #[serde(rename = "status")]
    pub status: GrantStatus,
    /// Established session id; empty unless granted
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// Response payload under the service session key; empty unless granted
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
}

impl ServiceResponse {
    /// Refusal response carrying no session
    pub fn refused(client_id: ClientId, device_id: DeviceId, status: GrantStatus) -> Self {
        Self {
            client_id,
            device_id,
            status,
            session_id: String::new(),
            encrypted_data: String::new(),
        }
    }

    /// Grant response for an established session
    pub fn granted(
        client_id: ClientId,
        device_id: DeviceId,
        session_id: &SessionId,
        encrypted_data: String,
    ) -> Self {
        Self {
            client_id,
            device_id,
            status: GrantStatus::Granted,
            session_id: session_id.as_str().to_string(),
            encrypted_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&GrantStatus::Granted).unwrap(),
            "\"granted\""
        );
        assert_eq!(
            serde_json::to_string(&GrantStatus::DeviceUnavailable).unwrap(),
            "\"device_unavailable\""
        );
    }

    #[test]
    fn test_service_ticket_request_field_names() {
        let request = ServiceTicketRequest {
            encrypted_tgt: "e".into(),
            client_id: ClientId::new("c1").unwrap(),
            service_id: ServiceId::new("iotservice1").unwrap(),
            authenticator: "a".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        for field in ["encryptedTGT", "clientID", "serviceID", "authenticator"] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_nonce_challenge_round_trip() {
        let json = r#"{"nonce":"bm9uY2U=","expirationTime":1700000300}"#;
        let challenge: NonceChallenge = serde_json::from_str(json).unwrap();
        assert_eq!(challenge.expiration_time, 1_700_000_300);
        assert_eq!(serde_json::to_string(&challenge).unwrap(), json);
    }
}
