//! Miner lead submission.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use lg_05_epoch_engine::math;
use lg_06_commit_reveal::SubmissionReceipt;
use shared_types::Role;

use crate::auth::authenticate_body;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /submit` (miner). The body IS the lead blob; the signature
/// covers its canonical JSON.
pub async fn post_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(lead_blob): Json<serde_json::Value>,
) -> Result<Json<SubmissionReceipt>, ApiError> {
    let block = state.poller.current_block().await?;
    let epoch_id = math::epoch_id_for_block(block);

    let caller = authenticate_body(&state, &headers, &lead_blob, epoch_id, Role::Miner).await?;

    let receipt = state.submission.submit(&caller.hotkey, lead_blob).await?;
    Ok(Json(receipt))
}
