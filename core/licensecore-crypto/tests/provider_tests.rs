use licensecore_crypto::{
    challenge_message, classical, encode_nonce, generate_nonce, kem, proof_context, verify_proof,
    HybridKeyProvider, PqKeyPair, NONCE_SIZE, PROOF_SIZE,
};

// ── Transcript ───────────────────────────────────────────────────

#[test]
fn nonce_has_256_bits() {
    let nonce = generate_nonce();
    assert_eq!(nonce.len(), NONCE_SIZE);
    assert_ne!(nonce, generate_nonce());
}

#[test]
fn challenge_message_format() {
    let nonce = [0u8; 3];
    assert_eq!(encode_nonce(&nonce), "AAAA");
    assert_eq!(challenge_message("L1", &nonce), b"L1.AAAA".to_vec());
}

#[test]
fn proof_context_format() {
    let nonce = [0xFFu8; 3];
    assert_eq!(proof_context("L1", &nonce), b"Challenge////L1".to_vec());
}

#[test]
fn encode_nonce_uses_padding() {
    assert_eq!(encode_nonce(&[1u8; 32]).len(), 44);
    assert!(encode_nonce(&[1u8; 32]).ends_with('='));
}

// ── HybridKeyProvider ────────────────────────────────────────────

#[test]
fn provider_exposes_valid_public_keys() {
    let provider = HybridKeyProvider::new();
    let der = provider.classical_public_key().unwrap();
    classical::validate_public_key(&der).unwrap();
    kem::validate_public_key(provider.pq_public_key()).unwrap();
}

#[test]
fn provider_signature_verifies() {
    let provider = HybridKeyProvider::new();
    let der = provider.classical_public_key().unwrap();
    let sig = provider.sign(b"hello");
    assert!(classical::verify(&der, b"hello", &sig));
}

#[test]
fn respond_produces_verifiable_tuple() {
    let client = HybridKeyProvider::new();
    let server = PqKeyPair::generate();
    let nonce = generate_nonce();

    let response = client.respond("L1", &nonce, server.public_key()).unwrap();
    assert_eq!(response.proof.len(), PROOF_SIZE);

    let der = client.classical_public_key().unwrap();
    assert!(classical::verify(
        &der,
        &challenge_message("L1", &nonce),
        &response.signature
    ));

    let secret = kem::decapsulate(server.secret_key(), &response.ciphertext).unwrap();
    assert!(verify_proof(&secret, "L1", &nonce, &response.proof));
}

#[test]
fn respond_is_fresh_each_time() {
    let client = HybridKeyProvider::new();
    let server = PqKeyPair::generate();
    let nonce = generate_nonce();

    let a = client.respond("L1", &nonce, server.public_key()).unwrap();
    let b = client.respond("L1", &nonce, server.public_key()).unwrap();
    assert_eq!(a.signature, b.signature);
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_ne!(a.proof, b.proof);
}

#[test]
fn proof_does_not_transfer_between_licenses() {
    let client = HybridKeyProvider::new();
    let server = PqKeyPair::generate();
    let nonce = generate_nonce();

    let response = client.respond("L1", &nonce, server.public_key()).unwrap();
    let secret = kem::decapsulate(server.secret_key(), &response.ciphertext).unwrap();
    assert!(!verify_proof(&secret, "L2", &nonce, &response.proof));
    assert!(!verify_proof(&secret, "L1", &generate_nonce(), &response.proof));
}

#[test]
fn respond_rejects_malformed_server_key() {
    let client = HybridKeyProvider::new();
    assert!(client.respond("L1", &generate_nonce(), &[0u8; 10]).is_err());
}
