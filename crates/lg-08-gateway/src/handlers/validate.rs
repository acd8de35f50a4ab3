//! Validator commit endpoint.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use lg_05_epoch_engine::math;
use lg_06_commit_reveal::CommitRequest;
use serde::{Deserialize, Serialize};
use shared_types::Role;
use uuid::Uuid;

use crate::auth::authenticate_body;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /validate` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommitResponse {
    pub evidence_id: Uuid,
    pub epoch_id: u64,
}

/// `POST /validate` (validator): file per-lead commitment hashes.
pub async fn post_validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CommitResponse>, ApiError> {
    let block = state.poller.current_block().await?;
    let current_epoch = math::epoch_id_for_block(block);

    let caller =
        authenticate_body(&state, &headers, &body, current_epoch, Role::Validator).await?;

    let request: CommitRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::data(format!("malformed commit payload: {e}")))?;
    let epoch_id = request.epoch_id;

    let evidence_id = state
        .commit
        .commit(&caller.hotkey, request, block)
        .await?;
    Ok(Json(CommitResponse {
        evidence_id,
        epoch_id,
    }))
}
