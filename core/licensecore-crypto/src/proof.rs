//! Challenge transcript and key-confirmation proof.
//!
//! Both sides must build these byte strings identically:
//!
//! - signed message: `"{license_key}.{nonce_b64}"`
//! - proof context: `"Challenge{nonce_b64}{license_key}"`
//!
//! where `nonce_b64` is standard padded base64 of the raw nonce.

use crate::error::CryptoResult;
use crate::kem::SharedSecret;
use crate::key::{keyed_hash, keyed_hash_matches, MAC_SIZE};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// Size of a challenge nonce in bytes (256 bits).
pub const NONCE_SIZE: usize = 32;

/// Size of a proof-of-possession tag in bytes.
pub const PROOF_SIZE: usize = MAC_SIZE;

/// Label prefixed to the proof context.
pub const PROOF_LABEL: &str = "Challenge";

/// Generates a random challenge nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encodes a nonce the way it appears in the transcript and on the wire.
pub fn encode_nonce(nonce: &[u8]) -> String {
    STANDARD.encode(nonce)
}

/// The byte string covered by the classical signature.
pub fn challenge_message(license_key: &str, nonce: &[u8]) -> Vec<u8> {
    format!("{license_key}.{}", encode_nonce(nonce)).into_bytes()
}

/// The byte string covered by the proof-of-possession tag.
pub fn proof_context(license_key: &str, nonce: &[u8]) -> Vec<u8> {
    format!("{PROOF_LABEL}{}{license_key}", encode_nonce(nonce)).into_bytes()
}

/// Computes the proof-of-possession tag for a shared secret.
pub fn proof_of_possession(
    secret: &SharedSecret,
    license_key: &str,
    nonce: &[u8],
) -> CryptoResult<[u8; PROOF_SIZE]> {
    keyed_hash(secret.as_bytes(), &proof_context(license_key, nonce))
}

/// Checks a submitted proof-of-possession tag in constant time.
#[must_use]
pub fn verify_proof(secret: &SharedSecret, license_key: &str, nonce: &[u8], tag: &[u8]) -> bool {
    keyed_hash_matches(secret.as_bytes(), &proof_context(license_key, nonce), tag)
}
