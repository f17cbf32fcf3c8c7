//! Shared test helpers for license tests.

#![allow(dead_code)]

use licensecore::{
    LicenseService, LicenseStore, MemoryLicenseStore, ServiceConfig, ValidationAttempt,
};
use licensecore_crypto::{ChallengeProof, HybridKeyProvider, IntegritySecret};
use std::sync::Arc;

pub const LICENSE: &str = "LIC-TEST-0001";

/// Deterministic integrity secret.
pub fn test_secret() -> IntegritySecret {
    IntegritySecret::from_bytes([7u8; 32])
}

/// Service over a fresh in-memory store with default settings.
pub fn memory_service() -> LicenseService {
    service_with(Arc::new(MemoryLicenseStore::new()), ServiceConfig::default())
}

pub fn service_with(store: Arc<dyn LicenseStore>, config: ServiceConfig) -> LicenseService {
    LicenseService::new(store, test_secret(), config)
}

/// Registers `identity` and returns the server's ML-KEM public key.
pub fn register(service: &LicenseService, key: &str, identity: &HybridKeyProvider) -> Vec<u8> {
    service
        .register(key, &identity.classical_public_key().unwrap(), identity.pq_public_key())
        .unwrap()
        .server_pq_public_key
}

pub fn attempt(key: &str, nonce: &[u8], proof: &ChallengeProof) -> ValidationAttempt {
    ValidationAttempt {
        license_key: key.to_string(),
        nonce: nonce.to_vec(),
        signature: proof.signature.clone(),
        ciphertext: proof.ciphertext.clone(),
        proof: proof.proof.clone(),
    }
}

/// Registers, challenges and builds an honest response without submitting it.
pub fn honest_attempt(
    service: &LicenseService,
    key: &str,
    identity: &HybridKeyProvider,
) -> ValidationAttempt {
    let server_pk = register(service, key, identity);
    let challenge = service.challenge(key).unwrap();
    let proof = identity.respond(key, &challenge.nonce, &server_pk).unwrap();
    attempt(key, &challenge.nonce, &proof)
}
