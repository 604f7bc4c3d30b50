//! Base64 conveyance
//!
//! All ciphertexts and signatures cross the wire base64-encoded with the
//! standard alphabet, padded.

use crate::error::CryptoError;
use crate::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Encode bytes for the wire
pub fn b64_encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64.encode(bytes)
}

/// Decode wire base64
pub fn b64_decode(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text)
        .map_err(|e| CryptoError::EncodingInvalid(format!("base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_padded_standard_alphabet() {
        let encoded = b64_encode(b"nonce");
        assert_eq!(encoded, "bm9uY2U=");
        assert_eq!(b64_decode(&encoded).unwrap(), b"nonce");
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert!(b64_decode("!!!").is_err());
    }
}
