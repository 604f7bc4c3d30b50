//! # Tessera Crypto
//!
//! The shared cryptographic contract of the three ticket servers:
//!
//! - [`pem`]: parse and serialize RSA keys carried as PEM, enforcing the
//!   2048-bit minimum before anything enters state
//! - [`asymmetric`]: RSA PKCS#1 v1.5 encryption and PKCS#1 v1.5 signatures
//!   over SHA-256 digests
//! - [`envelope`]: the AES-256-GCM envelope used wherever data travels
//!   under a symmetric session key
//! - [`derive`]: deterministic derivations covering nonces, session keys, AEAD
//!   nonces, and the ChaCha padding stream that replaces OS randomness for
//!   in-transaction RSA encryption
//! - [`encoding`]: the base64 conveyance used on the wire
//!
//! Nothing in this crate reads a clock or the OS entropy pool on its own;
//! callers on the replicated side pass deterministic inputs, callers on the
//! client side pass an OS RNG.

#![forbid(unsafe_code)]

pub mod asymmetric;
pub mod derive;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod pem;

pub use error::CryptoError;

/// Result alias for crypto helpers
pub type Result<T> = std::result::Result<T, CryptoError>;
