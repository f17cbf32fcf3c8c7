//! Classical half of the hybrid scheme: ECDSA over NIST P-256 with SHA-256.
//!
//! Public keys travel as SubjectPublicKeyInfo DER and signatures as the
//! RFC 3279 DER `SEQUENCE { r, s }`, so keys and signatures exported by
//! openssl or any platform crypto library interoperate unchanged.

use crate::error::{CryptoError, CryptoResult};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use rand::rngs::OsRng;

/// Upper bound on a DER encoded P-256 signature in bytes.
pub const MAX_SIGNATURE_SIZE: usize = 72;

/// Size of a P-256 secret scalar in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

const KIND: &str = "p256";

/// A P-256 signing key pair. The secret scalar is zeroized on drop.
pub struct ClassicalKeyPair {
    signing_key: SigningKey,
}

impl ClassicalKeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Rebuilds a key pair from a big-endian secret scalar.
    ///
    /// Fails when the bytes are the wrong length, zero, or not below the
    /// curve order.
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidSecretKey { kind: KIND })?;
        Ok(Self { signing_key })
    }

    /// Returns the public key as SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> CryptoResult<Vec<u8>> {
        let document = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|_| CryptoError::InvalidPublicKey { kind: KIND })?;
        Ok(document.as_bytes().to_vec())
    }

    /// Signs `data` (hashed with SHA-256, RFC 6979 nonce) and returns the
    /// DER encoded signature.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_der().as_bytes().to_vec()
    }
}

impl std::fmt::Debug for ClassicalKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassicalKeyPair")
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// Parses a SubjectPublicKeyInfo DER encoded P-256 public key.
pub fn parse_public_key(der: &[u8]) -> CryptoResult<VerifyingKey> {
    VerifyingKey::from_public_key_der(der).map_err(|_| CryptoError::InvalidPublicKey { kind: KIND })
}

/// Checks that `der` is a well-formed P-256 public key.
pub fn validate_public_key(der: &[u8]) -> CryptoResult<()> {
    parse_public_key(der).map(|_| ())
}

/// Verifies a DER encoded `signature` over `data` with a DER encoded
/// public key.
///
/// Never errors: a key that does not parse, a signature that is not
/// strict DER or a mismatching signature all yield `false`.
#[must_use]
pub fn verify(public_key_der: &[u8], data: &[u8], signature: &[u8]) -> bool {
    if signature.len() > MAX_SIGNATURE_SIZE {
        return false;
    }
    let Ok(verifying_key) = parse_public_key(public_key_der) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(signature) else {
        return false;
    };
    verifying_key.verify(data, &signature).is_ok()
}
