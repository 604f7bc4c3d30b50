//! Principal identifiers used across the Tessera platform
//!
//! Identifiers are caller-supplied strings. Because they are embedded into
//! the hierarchical ledger key namespace with `_` as the separator, the
//! accepted alphabet is restricted to ASCII alphanumerics plus `-` and `.`;
//! anything else would let one principal's keys shadow another's prefixes.

use crate::errors::{Result, TesseraError};
use serde::{Deserialize, Serialize};
use std::fmt;

fn validate_identifier(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TesseraError::invalid_input(format!("{what} is empty")));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(TesseraError::invalid_input(format!(
            "{what} {value:?} contains characters outside [A-Za-z0-9.-]"
        )));
    }
    Ok(())
}

macro_rules! string_identifier {
    ($(#[$doc:meta])* $name:ident, $what:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a caller-supplied identifier
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                validate_identifier(&value, $what)?;
                Ok(Self(value))
            }

            /// View the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_identifier!(
    /// Identifier of a client principal registered with the AS
    ClientId,
    "client id"
);

string_identifier!(
    /// Identifier of an IoT device registered with the ISV
    DeviceId,
    "device id"
);

string_identifier!(
    /// Identifier of a named service a client requests a ticket for
    ServiceId,
    "service id"
);

/// Identifier of a bounded client-device session
///
/// A session id is the session's ledger key: `SESSION_<client>_<device>_<unix>`.
/// Carrying the key as the id lets `CloseSession` and `HandleDeviceResponse`
/// address the record with a single point read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Derive the session id for a client-device pair established at `unix`
    pub fn derive(client: &ClientId, device: &DeviceId, unix: u64) -> Self {
        Self(format!("SESSION_{client}_{device}_{unix}"))
    }

    /// Accept a session id received from a caller
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !value.starts_with("SESSION_") {
            return Err(TesseraError::invalid_input(format!(
                "session id {value:?} is not of the form SESSION_<client>_<device>_<unix>"
            )));
        }
        Ok(Self(value))
    }

    /// View the session id as a string slice (also its ledger key)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_identifiers() {
        assert!(ClientId::new("c1").is_ok());
        assert!(DeviceId::new("sensor-7.east").is_ok());
        assert!(ServiceId::new("iotservice1").is_ok());
    }

    #[test]
    fn test_rejects_namespace_breaking_identifiers() {
        assert!(ClientId::new("").is_err());
        assert!(ClientId::new("c_1").is_err());
        assert!(ClientId::new("c 1").is_err());
        assert!(DeviceId::new("d/1").is_err());
    }

    #[test]
    fn test_session_id_round_trip() {
        let client = ClientId::new("c1").unwrap();
        let device = DeviceId::new("d1").unwrap();
        let id = SessionId::derive(&client, &device, 1_700_000_000);
        assert_eq!(id.as_str(), "SESSION_c1_d1_1700000000");
        assert_eq!(SessionId::parse(id.as_str()).unwrap(), id);
        assert!(SessionId::parse("TICKET_c1_d1_5").is_err());
    }
}
