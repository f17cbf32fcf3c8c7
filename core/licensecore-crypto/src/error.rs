//! Error types for the hybrid crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in hybrid key operations.
///
/// Variants intentionally carry no detail about *why* an input was rejected
/// beyond what the caller already supplied.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A public key did not parse under the fixed parameter set.
    #[error("invalid {kind} public key")]
    InvalidPublicKey { kind: &'static str },

    /// A stored secret key did not parse under the fixed parameter set.
    #[error("invalid {kind} secret key")]
    InvalidSecretKey { kind: &'static str },

    /// Signature bytes were not a valid encoding.
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// Decapsulation could not produce a shared secret.
    #[error("decapsulation failed")]
    Decapsulation,

    /// Keyed hash could not be initialised.
    #[error("keyed hash failed: {0}")]
    KeyedHash(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
