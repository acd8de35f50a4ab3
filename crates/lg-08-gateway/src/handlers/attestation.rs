//! Public attestation endpoints: anyone can fetch the document binding
//! the enclave's signing key to the deployed code.

use axum::extract::State;
use axum::Json;
use lg_04_transparency::AttestationDocument;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /attestation/document` (public).
pub async fn get_document(
    State(state): State<AppState>,
) -> Result<Json<AttestationDocument>, ApiError> {
    let doc = state
        .tee
        .get_attestation()
        .await
        .map_err(|_| ApiError::upstream("enclave unavailable"))?;
    Ok(Json(doc))
}

/// `GET /attestation/pubkey` (public).
#[derive(Debug, Serialize, Deserialize)]
pub struct PubkeyResponse {
    pub enclave_pubkey: String,
}

pub async fn get_pubkey(State(state): State<AppState>) -> Result<Json<PubkeyResponse>, ApiError> {
    let enclave_pubkey = state
        .tee
        .get_public_key()
        .await
        .map_err(|_| ApiError::upstream("enclave unavailable"))?;
    Ok(Json(PubkeyResponse { enclave_pubkey }))
}

/// `GET /attestation/health` (public).
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub buffered_events: usize,
    pub next_checkpoint_number: u64,
}

pub async fn get_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = state
        .tee
        .get_buffer_stats()
        .await
        .map_err(|_| ApiError::upstream("enclave unavailable"))?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        buffered_events: stats.buffered_events,
        next_checkpoint_number: stats.next_checkpoint_number,
    }))
}
