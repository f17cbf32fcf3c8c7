//! Hybrid classical / post-quantum primitives for LicenseCore.
//!
//! - ECDSA P-256 / SHA-256 signatures, SubjectPublicKeyInfo DER public keys
//!   and DER signatures
//! - ML-KEM-768 key encapsulation
//! - HMAC-SHA-256 key confirmation and integrity hashes
//!
//! Verification helpers never error: malformed input is simply a failed
//! check, so callers can combine per-factor booleans without early returns.

pub mod classical;
mod error;
pub mod kem;
mod key;
mod proof;
mod provider;

pub use classical::ClassicalKeyPair;
pub use error::{CryptoError, CryptoResult};
pub use kem::{PqKeyPair, PqSecretKey, SharedSecret};
pub use key::{
    integrity_hash, integrity_matches, keyed_hash, keyed_hash_matches, IntegritySecret,
    INTEGRITY_SECRET_SIZE, MAC_SIZE,
};
pub use proof::{
    challenge_message, encode_nonce, generate_nonce, proof_context, proof_of_possession,
    verify_proof, NONCE_SIZE, PROOF_LABEL, PROOF_SIZE,
};
pub use provider::{ChallengeProof, HybridKeyProvider};
