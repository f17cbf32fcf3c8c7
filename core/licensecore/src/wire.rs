//! JSON request and response bodies for the three license endpoints.
//!
//! Field names are camelCase and every binary field travels as standard
//! base64.

use crate::error::{LicenseError, LicenseResult};
use crate::service::{Challenge, Registration, ValidationAttempt};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use licensecore_crypto::ChallengeProof;
use serde::{Deserialize, Serialize};

/// Decodes a base64 field, naming it in the error.
pub fn decode_field(name: &str, value: &str) -> LicenseResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| LicenseError::MalformedInput(format!("{name}: {e}")))
}

/// Decodes a base64 field, yielding empty bytes when it does not parse.
fn decode_lenient(value: &str) -> Vec<u8> {
    BASE64.decode(value).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub license_key: String,
    pub classical_public_key: String,
    pub pq_public_key: String,
}

impl RegisterRequest {
    /// Builds a request from raw key bytes.
    pub fn new(license_key: &str, classical_public_key: &[u8], pq_public_key: &[u8]) -> Self {
        Self {
            license_key: license_key.to_string(),
            classical_public_key: BASE64.encode(classical_public_key),
            pq_public_key: BASE64.encode(pq_public_key),
        }
    }

    /// Decodes both public keys. Fails with `MalformedInput`.
    pub fn decode_keys(&self) -> LicenseResult<(Vec<u8>, Vec<u8>)> {
        let classical = decode_field("classicalPublicKey", &self.classical_public_key)?;
        let pq = decode_field("pqPublicKey", &self.pq_public_key)?;
        Ok((classical, pq))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub registered: bool,
    pub server_pq_public_key: String,
}

impl RegisterResponse {
    /// Decodes the server's ML-KEM public key.
    pub fn server_pq_public_key_bytes(&self) -> LicenseResult<Vec<u8>> {
        decode_field("serverPqPublicKey", &self.server_pq_public_key)
    }
}

impl From<Registration> for RegisterResponse {
    fn from(registration: Registration) -> Self {
        Self {
            registered: registration.registered,
            server_pq_public_key: BASE64.encode(&registration.server_pq_public_key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub license_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeResponse {
    /// Decodes the nonce.
    pub fn nonce_bytes(&self) -> LicenseResult<Vec<u8>> {
        decode_field("nonce", &self.nonce)
    }
}

impl From<Challenge> for ChallengeResponse {
    fn from(challenge: Challenge) -> Self {
        Self {
            nonce: BASE64.encode(&challenge.nonce),
            expires_at: challenge.expires_at,
        }
    }
}

/// Missing fields deserialize as empty strings and fail verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateRequest {
    pub license_key: String,
    pub nonce: String,
    pub signature: String,
    pub pq_ciphertext: String,
    pub proof_of_possession: String,
}

impl ValidateRequest {
    /// Builds a request from a client's challenge response.
    pub fn new(license_key: &str, nonce: &[u8], proof: &ChallengeProof) -> Self {
        Self {
            license_key: license_key.to_string(),
            nonce: BASE64.encode(nonce),
            signature: BASE64.encode(&proof.signature),
            pq_ciphertext: BASE64.encode(&proof.ciphertext),
            proof_of_possession: BASE64.encode(&proof.proof),
        }
    }

    /// Converts into a validation attempt.
    ///
    /// Never fails: a field that is not valid base64 becomes empty bytes,
    /// which cannot verify, so the attempt still consumes the pending nonce.
    pub fn into_attempt(self) -> ValidationAttempt {
        ValidationAttempt {
            nonce: decode_lenient(&self.nonce),
            signature: decode_lenient(&self.signature),
            ciphertext: decode_lenient(&self.pq_ciphertext),
            proof: decode_lenient(&self.proof_of_possession),
            license_key: self.license_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
}
