//! HTTP API for the license server.
//!
//! Three POST endpoints take and return the JSON bodies in
//! [`licensecore::wire`]:
//!
//! | route        | success                    | failure                    |
//! |--------------|----------------------------|----------------------------|
//! | `/register`  | 200 `RegisterResponse`     | 400 malformed keys         |
//! | `/challenge` | 200 `ChallengeResponse`    | 404 unknown license        |
//! | `/validate`  | 200 `{"valid": true}`      | 401, empty body            |
//!
//! Service calls do crypto and storage I/O, so they run on the blocking pool.

use anyhow::{bail, Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use licensecore::wire::{
    ChallengeRequest, ChallengeResponse, RegisterRequest, RegisterResponse, ValidateRequest,
    ValidateResponse,
};
use licensecore::{
    LicenseError, LicenseResult, LicenseService, LicenseStore, MemoryLicenseStore,
    SqliteLicenseStore,
};
use licensecore_crypto::{IntegritySecret, INTEGRITY_SECRET_SIZE};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Database argument that selects the in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// A [`LicenseError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(LicenseError);

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(LicenseError::MalformedInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            LicenseError::MalformedInput(detail) => {
                (StatusCode::BAD_REQUEST, detail).into_response()
            }
            LicenseError::NotFound => StatusCode::NOT_FOUND.into_response(),
            LicenseError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            other => {
                error!(error = %other, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

/// Runs a service call on the blocking pool.
async fn run_blocking<T, F>(service: Arc<LicenseService>, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LicenseService) -> LicenseResult<T> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| LicenseError::Storage(format!("worker task failed: {e}")))?;
    Ok(outcome?)
}

async fn register_handler(
    State(service): State<Arc<LicenseService>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(request) = body?;
    let (classical, pq) = request.decode_keys()?;
    let registration = run_blocking(service, move |svc| {
        svc.register(&request.license_key, &classical, &pq)
    })
    .await?;
    Ok(Json(registration.into()))
}

async fn challenge_handler(
    State(service): State<Arc<LicenseService>>,
    body: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let Json(request) = body?;
    let challenge = run_blocking(service, move |svc| svc.challenge(&request.license_key)).await?;
    Ok(Json(challenge.into()))
}

async fn validate_handler(
    State(service): State<Arc<LicenseService>>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(request) = body?;
    let attempt = request.into_attempt();
    run_blocking(service, move |svc| svc.validate(&attempt)).await?;
    Ok(Json(ValidateResponse { valid: true }))
}

/// Build the HTTP API router over the given service.
pub fn build_router(service: Arc<LicenseService>) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/challenge", post(challenge_handler))
        .route("/validate", post(validate_handler))
        .with_state(service)
}

/// Opens the store named by `database`: `:memory:` for an in-process map,
/// anything else as a SQLite path.
pub fn open_store(database: &str) -> Result<Arc<dyn LicenseStore>> {
    if database == IN_MEMORY_DATABASE {
        info!("Using in-memory license store");
        return Ok(Arc::new(MemoryLicenseStore::new()));
    }
    let store = SqliteLicenseStore::open(database)
        .with_context(|| format!("Failed to open license database {database}"))?;
    info!("Using SQLite license store at {}", database);
    Ok(Arc::new(store))
}

/// Parses a hex-encoded integrity secret.
pub fn parse_integrity_secret(hex_secret: &str) -> Result<IntegritySecret> {
    let bytes = hex::decode(hex_secret.trim()).context("Integrity secret is not valid hex")?;
    if bytes.len() != INTEGRITY_SECRET_SIZE {
        bail!(
            "Integrity secret must be {} bytes, got {}",
            INTEGRITY_SECRET_SIZE,
            bytes.len()
        );
    }
    Ok(IntegritySecret::from_slice(&bytes)?)
}

/// Periodically clears expired nonces until the task is aborted.
pub fn spawn_sweeper(service: Arc<LicenseService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let svc = service.clone();
            match tokio::task::spawn_blocking(move || svc.sweep_expired_nonces()).await {
                Ok(Ok(0)) => debug!("Nonce sweep found nothing to clear"),
                Ok(Ok(cleared)) => info!(cleared, "Swept expired nonces"),
                Ok(Err(e)) => warn!(error = %e, "Nonce sweep failed"),
                Err(e) => warn!(error = %e, "Nonce sweep task failed"),
            }
        }
    })
}
