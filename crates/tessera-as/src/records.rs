//! Records owned by the Authentication Server

use serde::{Deserialize, Serialize};
use tessera_core::{ClientId, TxTimestamp};

/// A registered client principal (`CLIENT_<id>`)
///
/// Never deleted in normal flow; `valid` guards every AS operation on the
/// client. Challenge state is deliberately kept out of this record; it
/// lives under its own key so transient authentication state cannot couple
/// with identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// The client's identifier
    #[serde(rename = "id")]
    pub id: ClientId,
    /// The client's RSA public key as PEM
    #[serde(rename = "publicKeyPEM")]
    pub public_key_pem: String,
    /// Unix second of registration
    #[serde(rename = "registrationTime")]
    pub registration_time: u64,
    /// Whether the identity may authenticate
    #[serde(rename = "valid")]
    pub valid: bool,
}

/// An outstanding nonce challenge (`AUTH_CHALLENGE_<id>`)
///
/// At most one exists per client; issuing a new challenge overwrites the
/// old one, which doubles as a session reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    /// Client the challenge addresses
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Base64 nonce to prove possession over
    #[serde(rename = "nonce")]
    pub nonce: String,
    /// Unix second after which the challenge is dead
    #[serde(rename = "expirationTime")]
    pub expiration_time: u64,
    /// Unix second the challenge was issued
    #[serde(rename = "createdAt")]
    pub created_at: u64,
}

impl AuthChallenge {
    /// Whether the challenge is past its expiration at `now`
    pub fn is_expired(&self, now: TxTimestamp) -> bool {
        now.is_after(self.expiration_time)
    }
}

/// Authentication state of one client, derived from stored records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAuthState {
    /// No identity registered
    Unregistered,
    /// Identity on file, no live challenge
    Registered,
    /// A challenge is outstanding and unexpired
    ChallengeOutstanding {
        /// The live challenge
        challenge: AuthChallenge,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_expiry_boundary() {
        let challenge = AuthChallenge {
            client_id: ClientId::new("c1").unwrap(),
            nonce: "bm9uY2U=".into(),
            expiration_time: 1_300,
            created_at: 1_000,
        };
        assert!(!challenge.is_expired(TxTimestamp::from_secs(1_300)));
        assert!(challenge.is_expired(TxTimestamp::from_secs(1_301)));
    }

    #[test]
    fn test_identity_json_field_names() {
        let identity = ClientIdentity {
            id: ClientId::new("c1").unwrap(),
            public_key_pem: "PEM".into(),
            registration_time: 9,
            valid: true,
        };
        let json = serde_json::to_value(&identity).unwrap();
        for field in ["id", "publicKeyPEM", "registrationTime", "valid"] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
