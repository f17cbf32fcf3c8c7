//! Client-side identity holding both halves of the hybrid key material.

use crate::classical::ClassicalKeyPair;
use crate::error::CryptoResult;
use crate::kem::{self, PqKeyPair, SharedSecret};
use crate::proof::{challenge_message, proof_of_possession};

/// Everything a client submits to answer one challenge.
#[derive(Clone, Debug)]
pub struct ChallengeProof {
    /// DER encoded P-256 ECDSA signature over the challenge message.
    pub signature: Vec<u8>,
    /// ML-KEM ciphertext encapsulated toward the server key.
    pub ciphertext: Vec<u8>,
    /// Key-confirmation tag derived from the encapsulated secret.
    pub proof: Vec<u8>,
}

/// A license holder's hybrid identity: a P-256 signing key and an
/// ML-KEM-768 key pair.
#[derive(Debug)]
pub struct HybridKeyProvider {
    classical: ClassicalKeyPair,
    pq: PqKeyPair,
}

impl HybridKeyProvider {
    /// Generates a fresh identity.
    pub fn new() -> Self {
        Self::from_parts(ClassicalKeyPair::generate(), PqKeyPair::generate())
    }

    /// Builds an identity from existing key pairs.
    pub fn from_parts(classical: ClassicalKeyPair, pq: PqKeyPair) -> Self {
        Self { classical, pq }
    }

    /// Classical public key as SubjectPublicKeyInfo DER.
    pub fn classical_public_key(&self) -> CryptoResult<Vec<u8>> {
        self.classical.public_key_der()
    }

    /// Raw ML-KEM-768 public key.
    pub fn pq_public_key(&self) -> &[u8] {
        self.pq.public_key()
    }

    /// Signs `data` with the classical key.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.classical.sign(data)
    }

    /// Encapsulates toward the server's ML-KEM public key.
    pub fn encapsulate(&self, server_public_key: &[u8]) -> CryptoResult<(Vec<u8>, SharedSecret)> {
        kem::encapsulate(server_public_key)
    }

    /// Builds the full response to a challenge: signature over the challenge
    /// message, a fresh encapsulation toward the server, and the proof tag.
    pub fn respond(
        &self,
        license_key: &str,
        nonce: &[u8],
        server_public_key: &[u8],
    ) -> CryptoResult<ChallengeProof> {
        let signature = self.sign(&challenge_message(license_key, nonce));
        let (ciphertext, secret) = self.encapsulate(server_public_key)?;
        let proof = proof_of_possession(&secret, license_key, nonce)?;
        Ok(ChallengeProof {
            signature,
            ciphertext,
            proof: proof.to_vec(),
        })
    }
}

impl Default for HybridKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}
