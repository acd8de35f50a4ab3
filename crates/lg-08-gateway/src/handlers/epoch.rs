//! Epoch metadata and the validator lead-fetch endpoint.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use lg_03_store::TransparencyLogStore;
use lg_05_epoch_engine::math;
use serde::{Deserialize, Serialize};
use shared_types::{EpochAssignment, Lead, Role, EPOCH_DURATION_BLOCKS, MAX_LEADS_PER_EPOCH};

use crate::auth::{authenticate_message, epoch_leads_message};
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /epoch/current` (public).
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentEpochResponse {
    pub epoch_id: u64,
    pub block: u64,
    pub block_within_epoch: u64,
    pub start_block: u64,
    pub end_block: u64,
}

pub async fn get_current(
    State(state): State<AppState>,
) -> Result<Json<CurrentEpochResponse>, ApiError> {
    let block = state.poller.current_block().await?;
    let epoch_id = math::epoch_id_for_block(block);
    Ok(Json(CurrentEpochResponse {
        epoch_id,
        block,
        block_within_epoch: math::block_within_epoch(block),
        start_block: math::epoch_start_block(epoch_id),
        end_block: math::epoch_start_block(epoch_id + 1),
    }))
}

/// `GET /epoch/{id}/info` (public).
#[derive(Debug, Serialize, Deserialize)]
pub struct EpochInfoResponse {
    pub epoch_id: u64,
    pub initialized: bool,
    pub start_block: u64,
    pub end_block: u64,
    pub assigned_lead_count: usize,
    pub queue_merkle_root: Option<String>,
    pub validator_count: usize,
    pub max_leads_per_epoch: usize,
}

pub async fn get_info(
    State(state): State<AppState>,
    Path(epoch_id): Path<u64>,
) -> Result<Json<EpochInfoResponse>, ApiError> {
    let entry = state.store.epoch_initialization(epoch_id).await?;
    let assignment = entry
        .as_ref()
        .map(lg_05_epoch_engine::lifecycle::assignment_from_entry)
        .transpose()
        .map_err(|_| ApiError::internal())?;

    let (assigned, root, validators) = match &assignment {
        Some(a) => (
            a.assigned_lead_ids.len(),
            Some(a.queue_merkle_root.clone()),
            a.validator_hotkeys.len(),
        ),
        None => (0, None, 0),
    };
    Ok(Json(EpochInfoResponse {
        epoch_id,
        initialized: assignment.is_some(),
        start_block: epoch_id * EPOCH_DURATION_BLOCKS,
        end_block: (epoch_id + 1) * EPOCH_DURATION_BLOCKS,
        assigned_lead_count: assigned,
        queue_merkle_root: root,
        validator_count: validators,
        max_leads_per_epoch: MAX_LEADS_PER_EPOCH,
    }))
}

/// `GET /epoch/{id}/leads` (validator).
#[derive(Debug, Serialize, Deserialize)]
pub struct EpochLeadsResponse {
    pub assignment: EpochAssignment,
    pub leads: Vec<Lead>,
}

pub async fn get_leads(
    State(state): State<AppState>,
    Path(epoch_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<EpochLeadsResponse>, ApiError> {
    let block = state.poller.current_block().await?;
    let current_epoch = math::epoch_id_for_block(block);
    if epoch_id != current_epoch {
        return Err(ApiError::temporal(format!(
            "epoch {epoch_id} is not the active epoch ({current_epoch})"
        )));
    }

    let (hotkey, _) = crate::auth::signed_headers(&headers)?;
    let message = epoch_leads_message(epoch_id, &hotkey);
    authenticate_message(&state, &headers, message.as_bytes(), epoch_id, Role::Validator)
        .await?;

    // May atomically materialize the EPOCH_INITIALIZATION event when the
    // request races the monitor at the boundary.
    let assignment = state.lifecycle.get_or_init_assignment(epoch_id).await.map_err(map_epoch)?;
    let leads = state.lifecycle.epoch_leads(epoch_id).await.map_err(map_epoch)?;
    Ok(Json(EpochLeadsResponse { assignment, leads }))
}

fn map_epoch(_: lg_05_epoch_engine::EpochError) -> ApiError {
    ApiError::upstream("epoch data unavailable")
}
