mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use common::{memory_service, LICENSE};
use licensecore::wire::{
    ChallengeResponse, RegisterRequest, RegisterResponse, ValidateRequest, ValidateResponse,
};
use licensecore::{Challenge, LicenseError, Registration};
use licensecore_crypto::HybridKeyProvider;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn register_request_uses_camel_case() {
    let request = RegisterRequest::new(LICENSE, &[1, 2, 3], &[4, 5]);
    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(
        value,
        json!({
            "licenseKey": LICENSE,
            "classicalPublicKey": "AQID",
            "pqPublicKey": "BAU=",
        })
    );
}

#[test]
fn register_request_decode_rejects_bad_base64() {
    let request = RegisterRequest {
        license_key: LICENSE.to_string(),
        classical_public_key: "AQID".to_string(),
        pq_public_key: "not base64!".to_string(),
    };

    match request.decode_keys() {
        Err(LicenseError::MalformedInput(msg)) => assert!(msg.contains("pqPublicKey")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn register_response_from_registration() {
    let response = RegisterResponse::from(Registration {
        registered: true,
        server_pq_public_key: vec![9, 9, 9],
    });
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value, json!({ "registered": true, "serverPqPublicKey": "CQkJ" }));
    assert_eq!(response.server_pq_public_key_bytes().unwrap(), vec![9, 9, 9]);
}

#[test]
fn challenge_response_carries_expiry() {
    let expires_at = chrono::DateTime::parse_from_rfc3339("2026-01-02T03:04:05.678Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let response = ChallengeResponse::from(Challenge {
        nonce: vec![0xFF; 4],
        expires_at,
    });
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["nonce"], "/////w==");
    assert_eq!(value["expiresAt"], "2026-01-02T03:04:05.678Z");

    let parsed: ChallengeResponse = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.expires_at, expires_at);
    assert_eq!(parsed.nonce_bytes().unwrap(), vec![0xFF; 4]);
}

#[test]
fn validate_request_field_names() {
    let value = json!({
        "licenseKey": LICENSE,
        "nonce": "AA==",
        "signature": "AQ==",
        "pqCiphertext": "Ag==",
        "proofOfPossession": "Aw==",
    });
    let request: ValidateRequest = serde_json::from_value(value).unwrap();
    let attempt = request.into_attempt();

    assert_eq!(attempt.license_key, LICENSE);
    assert_eq!(attempt.nonce, vec![0]);
    assert_eq!(attempt.signature, vec![1]);
    assert_eq!(attempt.ciphertext, vec![2]);
    assert_eq!(attempt.proof, vec![3]);
}

#[test]
fn validate_request_decodes_leniently() {
    let request = ValidateRequest {
        license_key: LICENSE.to_string(),
        nonce: "%%%".to_string(),
        signature: "AQ==".to_string(),
        pq_ciphertext: String::new(),
        proof_of_possession: "???".to_string(),
    };
    let attempt = request.into_attempt();

    assert!(attempt.nonce.is_empty());
    assert_eq!(attempt.signature, vec![1]);
    assert!(attempt.ciphertext.is_empty());
    assert!(attempt.proof.is_empty());
}

#[test]
fn malformed_validate_request_consumes_nonce() {
    let service = memory_service();
    let identity = HybridKeyProvider::new();
    let server_pk = common::register(&service, LICENSE, &identity);
    let challenge = service.challenge(LICENSE).unwrap();
    let proof = identity.respond(LICENSE, &challenge.nonce, &server_pk).unwrap();

    let mut broken = ValidateRequest::new(LICENSE, &challenge.nonce, &proof);
    broken.signature = "@@not-base64@@".to_string();
    assert!(matches!(
        service.validate(&broken.into_attempt()),
        Err(LicenseError::Unauthorized)
    ));

    let honest = ValidateRequest::new(LICENSE, &challenge.nonce, &proof);
    assert!(matches!(
        service.validate(&honest.into_attempt()),
        Err(LicenseError::Unauthorized)
    ));
}

#[test]
fn validate_request_round_trips_through_service() {
    let service = memory_service();
    let identity = HybridKeyProvider::new();
    let server_pk = common::register(&service, LICENSE, &identity);
    let challenge = ChallengeResponse::from(service.challenge(LICENSE).unwrap());
    let nonce = BASE64.decode(&challenge.nonce).unwrap();
    let proof = identity.respond(LICENSE, &nonce, &server_pk).unwrap();

    let body = serde_json::to_string(&ValidateRequest::new(LICENSE, &nonce, &proof)).unwrap();
    let request: ValidateRequest = serde_json::from_str(&body).unwrap();

    assert!(service.validate(&request.into_attempt()).is_ok());
}

#[test]
fn validate_response_shape() {
    let value = serde_json::to_value(ValidateResponse { valid: true }).unwrap();
    assert_eq!(value, json!({ "valid": true }));
}
