//! Post-quantum half of the hybrid scheme: ML-KEM-768 key encapsulation.

use crate::error::{CryptoError, CryptoResult};
use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an ML-KEM-768 public (encapsulation) key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 1184;

/// Size of an ML-KEM-768 secret (decapsulation) key in bytes.
pub const SECRET_KEY_SIZE: usize = 2400;

/// Size of an ML-KEM-768 ciphertext in bytes.
pub const CIPHERTEXT_SIZE: usize = 1088;

/// Size of the shared secret in bytes.
pub const SHARED_SECRET_SIZE: usize = 32;

const KIND: &str = "ml-kem-768";

/// An ML-KEM-768 secret key in its raw encoding, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PqSecretKey {
    bytes: Vec<u8>,
}

impl PqSecretKey {
    /// Wraps raw secret key bytes, checking the encoded length.
    pub fn from_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Returns the raw encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for PqSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PqSecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// An ML-KEM-768 key pair.
#[derive(Clone, Debug)]
pub struct PqKeyPair {
    public_key: Vec<u8>,
    secret_key: PqSecretKey,
}

impl PqKeyPair {
    /// Generates a fresh key pair.
    pub fn generate() -> Self {
        let (pk, sk) = mlkem768::keypair();
        Self {
            public_key: pk.as_bytes().to_vec(),
            secret_key: PqSecretKey {
                bytes: sk.as_bytes().to_vec(),
            },
        }
    }

    /// Returns the raw public key encoding.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Returns the secret key.
    pub fn secret_key(&self) -> &PqSecretKey {
        &self.secret_key
    }

    /// Splits the pair into its public encoding and secret key.
    pub fn into_parts(self) -> (Vec<u8>, PqSecretKey) {
        (self.public_key, self.secret_key)
    }
}

/// A 32-byte KEM shared secret, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Creates a shared secret from raw bytes.
    pub fn from_bytes(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// A uniformly random value with no relation to any ciphertext.
    ///
    /// Stands in for the decapsulated secret when decapsulation fails, so the
    /// proof check still runs and simply does not match.
    pub fn random() -> Self {
        let mut bytes = [0u8; SHARED_SECRET_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; SHARED_SECRET_SIZE] =
            slice.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SHARED_SECRET_SIZE,
                actual: slice.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Returns the secret bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Checks that `public_key` is a well-formed ML-KEM-768 public key.
pub fn validate_public_key(public_key: &[u8]) -> CryptoResult<()> {
    mlkem768::PublicKey::from_bytes(public_key)
        .map(|_| ())
        .map_err(|_| CryptoError::InvalidPublicKey { kind: KIND })
}

/// Encapsulates a fresh shared secret toward `peer_public_key`.
///
/// Every call draws new randomness, so two encapsulations to the same key
/// yield unrelated ciphertexts and secrets.
pub fn encapsulate(peer_public_key: &[u8]) -> CryptoResult<(Vec<u8>, SharedSecret)> {
    let pk = mlkem768::PublicKey::from_bytes(peer_public_key)
        .map_err(|_| CryptoError::InvalidPublicKey { kind: KIND })?;
    let (ss, ct) = mlkem768::encapsulate(&pk);
    Ok((ct.as_bytes().to_vec(), SharedSecret::from_slice(ss.as_bytes())?))
}

/// Recovers the shared secret for `ciphertext`.
///
/// A tampered ciphertext of the right length decapsulates to an unrelated
/// secret (implicit rejection); a ciphertext of the wrong length fails with
/// [`CryptoError::Decapsulation`]. Callers must treat both identically.
pub fn decapsulate(secret_key: &PqSecretKey, ciphertext: &[u8]) -> CryptoResult<SharedSecret> {
    let sk = mlkem768::SecretKey::from_bytes(secret_key.as_bytes())
        .map_err(|_| CryptoError::InvalidSecretKey { kind: KIND })?;
    let ct = mlkem768::Ciphertext::from_bytes(ciphertext).map_err(|_| CryptoError::Decapsulation)?;
    let ss = mlkem768::decapsulate(&ct, &sk);
    SharedSecret::from_slice(ss.as_bytes()).map_err(|_| CryptoError::Decapsulation)
}
