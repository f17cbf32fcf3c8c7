//! Keyed hashing and the process-wide integrity secret.
//!
//! Uses HMAC-SHA-256 for both the per-license integrity hash and the
//! key-confirmation proof.

use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Size of a keyed hash output in bytes.
pub const MAC_SIZE: usize = 32;

/// Size of the integrity secret in bytes.
pub const INTEGRITY_SECRET_SIZE: usize = 32;

/// Process-wide secret used only for integrity hashes, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IntegritySecret {
    bytes: [u8; INTEGRITY_SECRET_SIZE],
}

impl IntegritySecret {
    /// Generates a random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; INTEGRITY_SECRET_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a secret from raw bytes.
    pub fn from_bytes(bytes: [u8; INTEGRITY_SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a secret from a slice, checking its length.
    pub fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; INTEGRITY_SECRET_SIZE] =
            slice.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: INTEGRITY_SECRET_SIZE,
                actual: slice.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Returns the secret bytes.
    pub fn as_bytes(&self) -> &[u8; INTEGRITY_SECRET_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for IntegritySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegritySecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

fn new_mac(key: &[u8]) -> CryptoResult<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(key).map_err(|e| CryptoError::KeyedHash(e.to_string()))
}

/// Computes HMAC-SHA-256 of `data` under `key`.
pub fn keyed_hash(key: &[u8], data: &[u8]) -> CryptoResult<[u8; MAC_SIZE]> {
    let mut mac = new_mac(key)?;
    mac.update(data);
    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Checks `tag` against HMAC-SHA-256 of `data` under `key` in constant time.
///
/// Tags of the wrong length are rejected without error.
#[must_use]
pub fn keyed_hash_matches(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let Ok(mut mac) = new_mac(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

/// Integrity hash of a license identifier.
pub fn integrity_hash(secret: &IntegritySecret, license_key: &str) -> CryptoResult<[u8; MAC_SIZE]> {
    keyed_hash(secret.as_bytes(), license_key.as_bytes())
}

/// Returns true if `hash` is the integrity hash of `license_key`.
#[must_use]
pub fn integrity_matches(secret: &IntegritySecret, license_key: &str, hash: &[u8]) -> bool {
    keyed_hash_matches(secret.as_bytes(), license_key.as_bytes(), hash)
}
