//! Error types for license registration and validation.

use thiserror::Error;

/// License protocol errors.
///
/// `Unauthorized` is deliberately a single variant: callers never learn
/// which factor of a validation attempt failed.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Key material or identifier failed to parse.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// No license is registered under the identifier.
    #[error("license not found")]
    NotFound,

    /// Validation failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Storage error, including write contention that outlived all retries.
    #[error("storage error: {0}")]
    Storage(String),

    /// Network error talking to a license server.
    #[error("network error: {0}")]
    Network(String),

    /// Crypto error outside the verification path.
    #[error("crypto error: {0}")]
    Crypto(#[from] licensecore_crypto::CryptoError),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Errors from a [`LicenseStore`](crate::LicenseStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed (or appeared) since it was read.
    #[error("concurrent modification")]
    Conflict,

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row violates a record invariant.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for LicenseError {
    fn from(err: StoreError) -> Self {
        LicenseError::Storage(err.to_string())
    }
}
