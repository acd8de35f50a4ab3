//! Validator reveal endpoint and public reveal stats.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use lg_03_store::EvidenceStore;
use lg_05_epoch_engine::math;
use lg_06_commit_reveal::{RevealOutcome, RevealRequest};
use lg_07_consensus::LeadOutcome;
use serde::{Deserialize, Serialize};
use shared_types::Role;
use uuid::Uuid;

use crate::auth::authenticate_body;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /reveal` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevealResponse {
    /// `"revealed"` or `"already_revealed"`.
    pub status: String,
    pub lead_id: Uuid,
    /// Consensus decision as of this reveal, when the eager update ran.
    pub consensus_decision: Option<String>,
}

/// `POST /reveal` (validator): disclose committed values.
///
/// A verified first reveal triggers the eager consensus update; the
/// endpoint returns only after the lead row reflects it. The block-330
/// batch pass remains the canonical computation.
pub async fn post_reveal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<RevealResponse>, ApiError> {
    let block = state.poller.current_block().await?;
    let current_epoch = math::epoch_id_for_block(block);

    let caller =
        authenticate_body(&state, &headers, &body, current_epoch, Role::Validator).await?;

    let request: RevealRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::data(format!("malformed reveal payload: {e}")))?;
    let epoch_id = request.epoch_id;

    let outcome = state.reveal.reveal(&caller.hotkey, request, block).await?;

    match outcome {
        RevealOutcome::Revealed { lead_id } => {
            let consensus = state.consensus.update_lead(&lead_id, epoch_id).await?;
            let consensus_decision = match consensus {
                LeadOutcome::Applied { decision } => Some(decision.as_str().to_string()),
                // Lease held by the batch pass; its result is canonical.
                LeadOutcome::LeaseBusy | LeadOutcome::ZeroReveals => None,
            };
            Ok(Json(RevealResponse {
                status: "revealed".to_string(),
                lead_id,
                consensus_decision,
            }))
        }
        RevealOutcome::AlreadyRevealed { lead_id } => Ok(Json(RevealResponse {
            status: "already_revealed".to_string(),
            lead_id,
            consensus_decision: None,
        })),
    }
}

/// `GET /reveal/stats?epoch_id=N` (public).
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub epoch_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealStatsResponse {
    pub epoch_id: u64,
    pub commit_count: usize,
    pub revealed_count: usize,
}

pub async fn get_reveal_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<RevealStatsResponse>, ApiError> {
    let commit_count = state.store.count_for_epoch(query.epoch_id).await?;
    let revealed_count = state.store.revealed_count_for_epoch(query.epoch_id).await?;
    Ok(Json(RevealStatsResponse {
        epoch_id: query.epoch_id,
        commit_count,
        revealed_count,
    }))
}
