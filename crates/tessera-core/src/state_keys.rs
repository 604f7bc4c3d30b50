//! The hierarchical ledger key namespace
//!
//! All persisted state lives in a single logical key-value namespace with
//! `_`-separated string keys. Each component exclusively writes its own
//! prefixes; the public-key registry keys are written once at initialization
//! and read-only thereafter.
//!
//! The shapes here are bit-exact: peers, auditors, and replaying replicas
//! all compute the same keys. Identifier validation (see
//! [`crate::identifiers`]) keeps principal ids from smuggling separators
//! into the namespace.
//!
//! Two prefixes overlap by construction and readers must disambiguate:
//! `DEVICE_<id>` records share the `DEVICE_` prefix with `DEVICE_REG_*` and
//! `DEVICE_STATUS_*` audit keys, and `SESSION_KEY_<id>` shares `SESSION_`
//! with session records. Range scans over those prefixes filter on key
//! shape before parsing.

use crate::identifiers::{ClientId, DeviceId, ServiceId, SessionId};

/// AS private key (component-private state)
pub const AS_PRIVATE_KEY: &str = "AS_PRIVATE_KEY";
/// AS published public key
pub const AS_PUBLIC_KEY: &str = "AS_PUBLIC_KEY";
/// TGS private key (component-private state)
pub const TGS_PRIVATE_KEY: &str = "TGS_PRIVATE_KEY";
/// TGS published public key
pub const TGS_PUBLIC_KEY: &str = "TGS_PUBLIC_KEY";
/// ISV private key (component-private state)
pub const ISV_PRIVATE_KEY: &str = "ISV_PRIVATE_KEY";
/// ISV published public key
pub const ISV_PUBLIC_KEY: &str = "ISV_PUBLIC_KEY";

/// Client identity record owned by the AS
pub fn client(id: &ClientId) -> String {
    format!("CLIENT_{id}")
}

/// Raw PEM of a registered client's public key
pub fn client_pk(id: &ClientId) -> String {
    format!("CLIENT_PK_{id}")
}

/// Outstanding nonce challenge for a client (at most one at a time)
pub fn auth_challenge(id: &ClientId) -> String {
    format!("AUTH_CHALLENGE_{id}")
}

/// Audit record of a minted TGT
pub fn tgt_audit(id: &ClientId, unix: u64) -> String {
    format!("TGT_{id}_{unix}")
}

/// Client registration record owned by the TGS
pub fn client_record(id: &ClientId) -> String {
    format!("CLIENT_RECORD_{id}")
}

/// Session key retained for a client by the TGS or ISV
pub fn session_key(id: &ClientId) -> String {
    format!("SESSION_KEY_{id}")
}

/// One-time suppression record for a spent authenticator
pub fn auth_used(id: &ClientId, auth_hash_hex: &str) -> String {
    format!("AUTH_USED_{id}_{auth_hash_hex}")
}

/// Audit record of a TGT accepted by the TGS
pub fn registration_audit(id: &ClientId, unix: u64) -> String {
    format!("REGISTRATION_{id}_{unix}")
}

/// Audit record of a minted service ticket
pub fn ticket_audit(id: &ClientId, service: &ServiceId, unix: u64) -> String {
    format!("TICKET_{id}_{service}_{unix}")
}

/// Audit record of a service ticket forwarded towards the ISV
pub fn forwarding_audit(id: &ClientId, service: &ServiceId, unix: u64) -> String {
    format!("FORWARDING_{id}_{service}_{unix}")
}

/// IoT device record owned by the ISV
pub fn device(id: &DeviceId) -> String {
    format!("DEVICE_{id}")
}

/// Audit record of a device registration
pub fn device_registration_audit(id: &DeviceId, unix: u64) -> String {
    format!("DEVICE_REG_{id}_{unix}")
}

/// Audit record of a signed device status update
pub fn device_status_audit(id: &DeviceId, unix: u64) -> String {
    format!("DEVICE_STATUS_{id}_{unix}")
}

/// Audit record of a granted service request
pub fn service_grant_audit(client: &ClientId, device: &DeviceId, unix: u64) -> String {
    format!("SERVICE_GRANT_{client}_{device}_{unix}")
}

/// Device response appended to an active session
pub fn response_audit(session: &SessionId, unix: u64) -> String {
    format!("RESPONSE_{session}_{unix}")
}

/// Prefix of all session records (`SESSION_<client>_<device>_<unix>`)
pub const SESSION_PREFIX: &str = "SESSION_";
/// Prefix of retained session keys, nested inside [`SESSION_PREFIX`]
pub const SESSION_KEY_PREFIX: &str = "SESSION_KEY_";
/// Prefix of all device records and device audit keys
pub const DEVICE_PREFIX: &str = "DEVICE_";
/// Prefix of device registration audit keys
pub const DEVICE_REG_PREFIX: &str = "DEVICE_REG_";
/// Prefix of device status audit keys
pub const DEVICE_STATUS_PREFIX: &str = "DEVICE_STATUS_";

/// Prefix of session records for one client
pub fn session_prefix_for_client(id: &ClientId) -> String {
    format!("SESSION_{id}_")
}

/// Half-open `[start, end)` range covering every key with the given prefix
///
/// Keys are ASCII by construction, so a single `\u{10FFFF}` sentinel upper
/// bound is above every extension of the prefix.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (prefix.to_string(), format!("{prefix}\u{10FFFF}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> ClientId {
        ClientId::new(id).unwrap()
    }

    #[test]
    fn test_key_shapes_are_bit_exact() {
        let client_id = c("c1");
        let device_id = DeviceId::new("d1").unwrap();
        let service_id = ServiceId::new("iotservice1").unwrap();
        assert_eq!(client(&client_id), "CLIENT_c1");
        assert_eq!(client_pk(&client_id), "CLIENT_PK_c1");
        assert_eq!(auth_challenge(&client_id), "AUTH_CHALLENGE_c1");
        assert_eq!(tgt_audit(&client_id, 7), "TGT_c1_7");
        assert_eq!(client_record(&client_id), "CLIENT_RECORD_c1");
        assert_eq!(session_key(&client_id), "SESSION_KEY_c1");
        assert_eq!(auth_used(&client_id, "abcd"), "AUTH_USED_c1_abcd");
        assert_eq!(registration_audit(&client_id, 7), "REGISTRATION_c1_7");
        assert_eq!(
            ticket_audit(&client_id, &service_id, 7),
            "TICKET_c1_iotservice1_7"
        );
        assert_eq!(
            forwarding_audit(&client_id, &service_id, 7),
            "FORWARDING_c1_iotservice1_7"
        );
        assert_eq!(device(&device_id), "DEVICE_d1");
        assert_eq!(device_registration_audit(&device_id, 7), "DEVICE_REG_d1_7");
        assert_eq!(device_status_audit(&device_id, 7), "DEVICE_STATUS_d1_7");
        assert_eq!(
            service_grant_audit(&client_id, &device_id, 7),
            "SERVICE_GRANT_c1_d1_7"
        );
    }

    #[test]
    fn test_prefix_range_covers_extensions_only() {
        let (start, end) = prefix_range("CLIENT_");
        assert!("CLIENT_c1" >= start.as_str());
        assert!("CLIENT_c1" < end.as_str());
        assert!("CLIENT" < start.as_str());
        assert!("CLIENT_PK_c1" < end.as_str());
    }
}
