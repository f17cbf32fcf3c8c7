//! Registration, challenge and validation over a [`LicenseStore`].
//!
//! Every operation reads the current record, derives the new one, and writes
//! it back conditional on the version it read. A conflicting concurrent write
//! makes the operation start over from a fresh read.
//!
//! Validation evaluates every factor unconditionally and combines the
//! results at the end:
//!
//! | factor      | check                                                   |
//! |-------------|---------------------------------------------------------|
//! | `fresh`     | pending nonce not yet expired                           |
//! | `nonce`     | presented nonce equals the pending one (constant time)  |
//! | `signature` | ECDSA P-256 over `"{key}.{nonce_b64}"`, stored key      |
//! | `pq`        | HMAC proof keyed by the decapsulated secret             |
//!
//! The pending nonce is cleared whatever the outcome.

use crate::error::{LicenseError, LicenseResult, StoreError};
use crate::record::{is_valid_license_key, LicenseRecord, PendingNonce, VersionToken};
use crate::store::LicenseStore;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use licensecore_crypto::{
    challenge_message, classical, generate_nonce, integrity_hash, integrity_matches, kem,
    verify_proof, IntegritySecret, PqKeyPair, PqSecretKey, SharedSecret,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

/// Default lifetime of a challenge nonce (30 seconds).
pub const DEFAULT_NONCE_TTL_SECS: i64 = 30;

/// Default number of optimistic write attempts per operation.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 8;

/// Service tuning.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// How long an issued nonce stays valid.
    pub nonce_ttl: Duration,
    /// How many times a conflicting write is retried before giving up.
    pub max_write_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            nonce_ttl: Duration::seconds(DEFAULT_NONCE_TTL_SECS),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Always true; present for the wire contract.
    pub registered: bool,
    /// The freshly generated server ML-KEM public key for this license.
    pub server_pq_public_key: Vec<u8>,
}

/// An issued challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Raw nonce bytes.
    pub nonce: Vec<u8>,
    /// When the nonce stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// One validation attempt as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct ValidationAttempt {
    pub license_key: String,
    pub nonce: Vec<u8>,
    pub signature: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Per-factor outcome of a validation attempt.
#[derive(Debug, Clone, Copy)]
struct FactorChecks {
    fresh: bool,
    nonce_ok: bool,
    signature_ok: bool,
    pq_ok: bool,
}

impl FactorChecks {
    fn passed(&self) -> bool {
        self.fresh & self.nonce_ok & self.signature_ok & self.pq_ok
    }
}

enum Write {
    Insert(LicenseRecord),
    Replace(LicenseRecord, VersionToken),
}

/// What one optimistic step wants persisted, and what to return if it lands.
struct Step<T> {
    write: Write,
    output: T,
}

/// The license authentication protocol.
pub struct LicenseService {
    store: Arc<dyn LicenseStore>,
    integrity: IntegritySecret,
    config: ServiceConfig,
}

impl LicenseService {
    /// Creates a service over `store`.
    pub fn new(
        store: Arc<dyn LicenseStore>,
        integrity: IntegritySecret,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            integrity,
            config,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn LicenseStore> {
        &self.store
    }

    /// Returns the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Registers (or re-registers) a license.
    ///
    /// A fresh server ML-KEM key pair is generated on every call; the
    /// previous one, and any nonce issued under it, is discarded.
    ///
    /// # Errors
    ///
    /// `MalformedInput` if the identifier or either public key does not
    /// parse; nothing is written in that case.
    pub fn register(
        &self,
        license_key: &str,
        classical_public_key: &[u8],
        pq_public_key: &[u8],
    ) -> LicenseResult<Registration> {
        if !is_valid_license_key(license_key) {
            return Err(LicenseError::MalformedInput(
                "license key must be 1-128 bytes".to_string(),
            ));
        }
        classical::validate_public_key(classical_public_key)
            .map_err(|e| LicenseError::MalformedInput(e.to_string()))?;
        kem::validate_public_key(pq_public_key)
            .map_err(|e| LicenseError::MalformedInput(e.to_string()))?;

        let hash = integrity_hash(&self.integrity, license_key)?.to_vec();
        let (server_public, server_secret) = PqKeyPair::generate().into_parts();

        let outcome = self.run_optimistic(license_key, |current| {
            let write = match current {
                None => Write::Insert(LicenseRecord::new(
                    license_key.to_string(),
                    classical_public_key.to_vec(),
                    pq_public_key.to_vec(),
                    server_secret.clone(),
                    hash.clone(),
                )),
                Some(mut record) => {
                    let expected = record.version();
                    record.rekey(
                        classical_public_key.to_vec(),
                        pq_public_key.to_vec(),
                        server_secret.clone(),
                        hash.clone(),
                    );
                    Write::Replace(record, expected)
                }
            };
            Ok(Step { write, output: () })
        })?;

        match outcome {
            Some(()) => {
                info!(license = %license_key, "License registered");
                Ok(Registration {
                    registered: true,
                    server_pq_public_key: server_public,
                })
            }
            None => Err(contention(license_key)),
        }
    }

    /// Issues a new challenge nonce, replacing any outstanding one.
    ///
    /// # Errors
    ///
    /// `NotFound` if the license was never registered.
    pub fn challenge(&self, license_key: &str) -> LicenseResult<Challenge> {
        if !is_valid_license_key(license_key) {
            return Err(LicenseError::NotFound);
        }
        let nonce = generate_nonce().to_vec();
        let expires_at = (Utc::now() + self.config.nonce_ttl).trunc_subsecs(3);

        let outcome = self.run_optimistic(license_key, |current| {
            let Some(mut record) = current else {
                return Err(LicenseError::NotFound);
            };
            if !integrity_matches(&self.integrity, record.key(), record.integrity_hash()) {
                warn!(license = %license_key, "Integrity hash mismatch on license record");
            }
            let expected = record.version();
            record.set_pending(PendingNonce::new(nonce.clone(), expires_at));
            Ok(Step {
                write: Write::Replace(record, expected),
                output: Challenge {
                    nonce: nonce.clone(),
                    expires_at,
                },
            })
        })?;

        match outcome {
            Some(challenge) => {
                debug!(license = %license_key, expires_at = %expires_at, "Challenge issued");
                Ok(challenge)
            }
            None => Err(contention(license_key)),
        }
    }

    /// Validates a challenge response. `Ok(())` means the client proved
    /// possession of both private keys for the pending nonce.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for every failure cause, indistinguishably.
    pub fn validate(&self, attempt: &ValidationAttempt) -> LicenseResult<()> {
        let license_key = attempt.license_key.as_str();
        if !is_valid_license_key(license_key) {
            return Err(LicenseError::Unauthorized);
        }
        let now = Utc::now();

        let outcome = self.run_optimistic(license_key, |current| {
            let Some(mut record) = current else {
                return Err(LicenseError::Unauthorized);
            };
            let Some(pending) = record.pending().cloned() else {
                return Err(LicenseError::Unauthorized);
            };
            let checks = check_factors(&record, &pending, attempt, now);
            let expected = record.version();
            record.clear_pending();
            Ok(Step {
                write: Write::Replace(record, expected),
                output: checks,
            })
        });

        match outcome {
            Ok(Some(checks)) => {
                debug!(
                    license = %license_key,
                    fresh = checks.fresh,
                    nonce = checks.nonce_ok,
                    signature = checks.signature_ok,
                    pq = checks.pq_ok,
                    "Validation factors"
                );
                let valid = checks.passed();
                info!(license = %license_key, valid, "Validation attempt");
                if valid {
                    Ok(())
                } else {
                    Err(LicenseError::Unauthorized)
                }
            }
            Ok(None) => {
                warn!(license = %license_key, "Validation abandoned after write contention");
                Err(LicenseError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    /// Clears nonces whose expiry has passed. Returns how many were cleared.
    pub fn sweep_expired_nonces(&self) -> LicenseResult<usize> {
        let cleared = self.store.clear_expired_nonces(Utc::now())?;
        if cleared > 0 {
            debug!(cleared, "Expired nonces swept");
        }
        Ok(cleared)
    }

    /// Loads, steps and conditionally writes until a write lands.
    /// Returns `Ok(None)` when every attempt hit a conflict.
    fn run_optimistic<T>(
        &self,
        license_key: &str,
        mut step: impl FnMut(Option<LicenseRecord>) -> LicenseResult<Step<T>>,
    ) -> LicenseResult<Option<T>> {
        for attempt in 1..=self.config.max_write_attempts {
            let current = self.store.load(license_key)?;
            let Step { write, output } = step(current)?;
            let written = match &write {
                Write::Insert(record) => self.store.insert(record),
                Write::Replace(record, expected) => self.store.replace(record, *expected),
            };
            match written {
                Ok(()) => return Ok(Some(output)),
                Err(StoreError::Conflict) => {
                    debug!(license = %license_key, attempt, "Write conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

fn contention(license_key: &str) -> LicenseError {
    warn!(license = %license_key, "Giving up after repeated write conflicts");
    LicenseError::Storage("write contention on license record".to_string())
}

fn check_factors(
    record: &LicenseRecord,
    pending: &PendingNonce,
    attempt: &ValidationAttempt,
    now: DateTime<Utc>,
) -> FactorChecks {
    let nonce = pending.nonce();
    let fresh = !pending.is_expired_at(now);
    let nonce_ok = bool::from(nonce.ct_eq(attempt.nonce.as_slice()));

    let message = challenge_message(record.key(), nonce);
    let signature_ok =
        classical::verify(record.classical_public_key(), &message, &attempt.signature);

    let secret = decapsulate_or_substitute(record.pq_secret_key(), &attempt.ciphertext);
    let pq_ok = verify_proof(&secret, record.key(), nonce, &attempt.proof);

    FactorChecks {
        fresh,
        nonce_ok,
        signature_ok,
        pq_ok,
    }
}

fn decapsulate_or_substitute(secret_key: &PqSecretKey, ciphertext: &[u8]) -> SharedSecret {
    kem::decapsulate(secret_key, ciphertext).unwrap_or_else(|_| SharedSecret::random())
}
