//! The per-license record: hybrid key material plus the pending challenge.
//!
//! A record holds:
//! - the client's P-256 public key (SPKI DER) and ML-KEM-768 public key
//! - the server-generated ML-KEM-768 secret key for this license
//! - an integrity hash of the identifier under the process secret
//! - at most one pending nonce with its expiry
//! - a version token that changes on every mutation
//!
//! The nonce and its expiry live in one `Option<PendingNonce>`, so one can
//! never be present without the other.

use chrono::{DateTime, Utc};
use licensecore_crypto::PqSecretKey;
use std::fmt;
use uuid::Uuid;

/// Maximum length of a license identifier in bytes.
pub const MAX_LICENSE_KEY_LEN: usize = 128;

/// Returns true if `key` is acceptable as a license identifier.
#[must_use]
pub fn is_valid_license_key(key: &str) -> bool {
    !key.trim().is_empty() && key.len() <= MAX_LICENSE_KEY_LEN
}

/// Opaque optimistic-concurrency token, regenerated on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken(Uuid);

impl VersionToken {
    /// Creates a fresh random token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a token from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a token from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for VersionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outstanding challenge nonce.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingNonce {
    nonce: Vec<u8>,
    expires_at: DateTime<Utc>,
}

impl PendingNonce {
    /// Creates a pending nonce.
    #[must_use]
    pub fn new(nonce: Vec<u8>, expires_at: DateTime<Utc>) -> Self {
        Self { nonce, expires_at }
    }

    /// Returns the raw nonce.
    #[must_use]
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Returns the expiry time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true once `now` is strictly past the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl fmt::Debug for PendingNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingNonce")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Stored state for one license identifier.
#[derive(Clone)]
pub struct LicenseRecord {
    key: String,
    classical_public_key: Vec<u8>,
    pq_public_key: Vec<u8>,
    pq_secret_key: PqSecretKey,
    integrity_hash: Vec<u8>,
    pending: Option<PendingNonce>,
    version: VersionToken,
}

impl LicenseRecord {
    /// Creates a record for a first registration.
    #[must_use]
    pub fn new(
        key: String,
        classical_public_key: Vec<u8>,
        pq_public_key: Vec<u8>,
        pq_secret_key: PqSecretKey,
        integrity_hash: Vec<u8>,
    ) -> Self {
        Self {
            key,
            classical_public_key,
            pq_public_key,
            pq_secret_key,
            integrity_hash,
            pending: None,
            version: VersionToken::new(),
        }
    }

    /// Rebuilds a record exactly as persisted.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        key: String,
        classical_public_key: Vec<u8>,
        pq_public_key: Vec<u8>,
        pq_secret_key: PqSecretKey,
        integrity_hash: Vec<u8>,
        pending: Option<PendingNonce>,
        version: VersionToken,
    ) -> Self {
        Self {
            key,
            classical_public_key,
            pq_public_key,
            pq_secret_key,
            integrity_hash,
            pending,
            version,
        }
    }

    /// Returns the license identifier.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the client's classical public key (SPKI DER).
    #[must_use]
    pub fn classical_public_key(&self) -> &[u8] {
        &self.classical_public_key
    }

    /// Returns the client's ML-KEM public key.
    #[must_use]
    pub fn pq_public_key(&self) -> &[u8] {
        &self.pq_public_key
    }

    /// The server's ML-KEM secret key. Never leaves the crate.
    pub(crate) fn pq_secret_key(&self) -> &PqSecretKey {
        &self.pq_secret_key
    }

    /// Returns the integrity hash.
    #[must_use]
    pub fn integrity_hash(&self) -> &[u8] {
        &self.integrity_hash
    }

    /// Returns the pending challenge, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingNonce> {
        self.pending.as_ref()
    }

    /// Returns the current version token.
    #[must_use]
    pub fn version(&self) -> VersionToken {
        self.version
    }

    /// Replaces all key material from a re-registration. Any pending nonce
    /// is dropped with the old server key.
    pub(crate) fn rekey(
        &mut self,
        classical_public_key: Vec<u8>,
        pq_public_key: Vec<u8>,
        pq_secret_key: PqSecretKey,
        integrity_hash: Vec<u8>,
    ) {
        self.classical_public_key = classical_public_key;
        self.pq_public_key = pq_public_key;
        self.pq_secret_key = pq_secret_key;
        self.integrity_hash = integrity_hash;
        self.pending = None;
        self.version = VersionToken::new();
    }

    /// Sets the pending challenge, replacing any previous one.
    pub(crate) fn set_pending(&mut self, pending: PendingNonce) {
        self.pending = Some(pending);
        self.version = VersionToken::new();
    }

    /// Consumes the pending challenge.
    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
        self.version = VersionToken::new();
    }
}

impl fmt::Debug for LicenseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseRecord")
            .field("key", &self.key)
            .field("pending", &self.pending)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
