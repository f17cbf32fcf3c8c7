use licensecore_crypto::{
    integrity_hash, integrity_matches, keyed_hash, keyed_hash_matches, CryptoError,
    IntegritySecret, INTEGRITY_SECRET_SIZE, MAC_SIZE,
};

// ── IntegritySecret ──────────────────────────────────────────────

#[test]
fn generate_produces_unique_secrets() {
    let a = IntegritySecret::generate();
    let b = IntegritySecret::generate();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn from_bytes_roundtrip() {
    let secret = IntegritySecret::from_bytes([7; INTEGRITY_SECRET_SIZE]);
    assert_eq!(secret.as_bytes(), &[7; INTEGRITY_SECRET_SIZE]);
}

#[test]
fn from_slice_rejects_wrong_length() {
    let err = IntegritySecret::from_slice(&[1; 16]).unwrap_err();
    match err {
        CryptoError::InvalidKeyLength { expected, actual } => {
            assert_eq!(expected, 32);
            assert_eq!(actual, 16);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn from_slice_accepts_exact_length() {
    let secret = IntegritySecret::from_slice(&[9; 32]).unwrap();
    assert_eq!(secret.as_bytes(), &[9; 32]);
}

#[test]
fn debug_redacts_secret() {
    let secret = IntegritySecret::from_bytes([0xAB; INTEGRITY_SECRET_SIZE]);
    let debug = format!("{secret:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains("171"));
}

// ── keyed_hash ───────────────────────────────────────────────────

#[test]
fn keyed_hash_is_deterministic() {
    let a = keyed_hash(b"key", b"data").unwrap();
    let b = keyed_hash(b"key", b"data").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), MAC_SIZE);
}

#[test]
fn keyed_hash_depends_on_key() {
    let a = keyed_hash(b"key-one", b"data").unwrap();
    let b = keyed_hash(b"key-two", b"data").unwrap();
    assert_ne!(a, b);
}

#[test]
fn keyed_hash_matches_rfc4231_case_2() {
    let tag = keyed_hash(b"Jefe", b"what do ya want for nothing?").unwrap();
    let expected = [
        0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
        0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
        0x64, 0xec, 0x38, 0x43,
    ];
    assert_eq!(tag, expected);
}

#[test]
fn keyed_hash_matches_accepts_correct_tag() {
    let tag = keyed_hash(b"key", b"data").unwrap();
    assert!(keyed_hash_matches(b"key", b"data", &tag));
}

#[test]
fn keyed_hash_matches_rejects_truncated_tag() {
    let tag = keyed_hash(b"key", b"data").unwrap();
    assert!(!keyed_hash_matches(b"key", b"data", &tag[..16]));
    assert!(!keyed_hash_matches(b"key", b"data", &[]));
}

// ── integrity hash ───────────────────────────────────────────────

#[test]
fn integrity_hash_verifies_for_same_license() {
    let secret = IntegritySecret::generate();
    let hash = integrity_hash(&secret, "L1").unwrap();
    assert!(integrity_matches(&secret, "L1", &hash));
}

#[test]
fn integrity_hash_differs_per_license() {
    let secret = IntegritySecret::generate();
    let hash = integrity_hash(&secret, "L1").unwrap();
    assert!(!integrity_matches(&secret, "L2", &hash));
}

#[test]
fn integrity_hash_differs_per_secret() {
    let a = IntegritySecret::generate();
    let b = IntegritySecret::generate();
    let hash = integrity_hash(&a, "L1").unwrap();
    assert!(!integrity_matches(&b, "L1", &hash));
}
