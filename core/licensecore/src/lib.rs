//! Hybrid challenge-response licensing.
//!
//! A license holder registers two public keys under a license identifier:
//! a P-256 ECDSA key and an ML-KEM-768 key. The server answers with a fresh
//! ML-KEM-768 public key of its own. To prove possession the client then
//! asks for a challenge nonce and returns:
//! - a DER encoded ECDSA P-256 signature over `"{licenseKey}.{base64(nonce)}"`
//! - an ML-KEM ciphertext encapsulated toward the server key
//! - an HMAC-SHA-256 tag over `"Challenge{base64(nonce)}{licenseKey}"`
//!   keyed by the encapsulated secret
//!
//! Validation succeeds only if every factor checks out against a nonce that
//! is pending and unexpired. Each nonce is consumed by its first validation
//! attempt, successful or not.
//!
//! # Layout
//!
//! - [`LicenseService`]: the three protocol operations plus nonce sweeping
//! - [`LicenseStore`]: versioned persistence (in memory or SQLite)
//! - [`wire`]: JSON bodies for the HTTP endpoints
//! - [`device`]: pseudonymized hardware IDs for clients
//! - `client` (feature `online`): an HTTP client for the endpoints

pub mod device;
mod error;
mod record;
mod service;
mod store;
pub mod wire;

#[cfg(feature = "online")]
mod client;

pub use device::{DeviceReport, HostSystemInfo, HwidProvider, SystemInfo};
pub use error::{LicenseError, LicenseResult, StoreError, StoreResult};
pub use record::{
    is_valid_license_key, LicenseRecord, PendingNonce, VersionToken, MAX_LICENSE_KEY_LEN,
};
pub use service::{
    Challenge, LicenseService, Registration, ServiceConfig, ValidationAttempt,
    DEFAULT_MAX_WRITE_ATTEMPTS, DEFAULT_NONCE_TTL_SECS,
};
pub use store::{LicenseStore, MemoryLicenseStore, SqliteLicenseStore};

#[cfg(feature = "online")]
pub use client::{LicenseClient, DEFAULT_SERVER_URL, SERVER_URL_ENV};
