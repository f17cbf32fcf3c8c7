//! HTTP client for a license server.

use crate::error::{LicenseError, LicenseResult};
use crate::wire::{
    ChallengeRequest, ChallengeResponse, RegisterRequest, RegisterResponse, ValidateRequest,
    ValidateResponse,
};
use licensecore_crypto::HybridKeyProvider;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

/// Environment variable overriding the server URL.
pub const SERVER_URL_ENV: &str = "LICENSE_SERVER_URL";

/// Server URL used when the environment does not name one.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5108";

/// Talks to the `/register`, `/challenge` and `/validate` endpoints.
#[derive(Debug, Clone)]
pub struct LicenseClient {
    http: Client,
    base_url: String,
}

impl LicenseClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Creates a client from `LICENSE_SERVER_URL`, falling back to
    /// `http://localhost:5108`.
    pub fn from_env() -> Self {
        let url = std::env::var(SERVER_URL_ENV).unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self::new(url)
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Registers `identity` under `license_key`. Returns the server's
    /// ML-KEM public key for this license.
    pub async fn register(
        &self,
        license_key: &str,
        identity: &HybridKeyProvider,
    ) -> LicenseResult<Vec<u8>> {
        let request = RegisterRequest::new(
            license_key,
            &identity.classical_public_key()?,
            identity.pq_public_key(),
        );
        let response: RegisterResponse = self.post("/register", &request).await?;
        response.server_pq_public_key_bytes()
    }

    /// Requests a fresh challenge nonce.
    pub async fn challenge(&self, license_key: &str) -> LicenseResult<ChallengeResponse> {
        let request = ChallengeRequest {
            license_key: license_key.to_string(),
        };
        self.post("/challenge", &request).await
    }

    /// Submits a challenge response. `Ok(())` means the server accepted it.
    pub async fn validate(&self, request: &ValidateRequest) -> LicenseResult<()> {
        let response: ValidateResponse = self.post("/validate", request).await?;
        if response.valid {
            Ok(())
        } else {
            Err(LicenseError::Unauthorized)
        }
    }

    /// Runs one full round: register, challenge, answer, validate.
    pub async fn activate(
        &self,
        license_key: &str,
        identity: &HybridKeyProvider,
    ) -> LicenseResult<()> {
        let server_pq_public_key = self.register(license_key, identity).await?;
        let challenge = self.challenge(license_key).await?;
        let nonce = challenge.nonce_bytes()?;
        let proof = identity.respond(license_key, &nonce, &server_pq_public_key)?;
        self.validate(&ValidateRequest::new(license_key, &nonce, &proof)).await?;
        info!(license = %license_key, "License activated");
        Ok(())
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> LicenseResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        debug!(path, "License server request");
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| LicenseError::Network(format!("{path} request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(|e| {
                LicenseError::Network(format!("failed to parse {path} response: {e}"))
            }),
            StatusCode::BAD_REQUEST => {
                let detail = response.text().await.unwrap_or_default();
                Err(LicenseError::MalformedInput(detail))
            }
            StatusCode::NOT_FOUND => Err(LicenseError::NotFound),
            StatusCode::UNAUTHORIZED => Err(LicenseError::Unauthorized),
            status => Err(LicenseError::Network(format!("{path} returned {status}"))),
        }
    }
}
