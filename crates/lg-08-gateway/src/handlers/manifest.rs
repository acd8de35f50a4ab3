//! Validator manifest endpoints.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use lg_05_epoch_engine::math;
use serde::{Deserialize, Serialize};
use shared_types::{Role, ValidatorManifest};

use crate::auth::authenticate_body;
use crate::error::ApiError;
use crate::handlers::reveal::StatsQuery;
use crate::state::AppState;

/// `POST /manifest` body.
#[derive(Debug, Deserialize)]
pub struct ManifestSubmission {
    pub epoch_id: u64,
    pub evidence_merkle_root: String,
}

/// `POST /manifest` (validator): prove completion of an epoch's work.
pub async fn post_manifest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ValidatorManifest>, ApiError> {
    let block = state.poller.current_block().await?;
    let current_epoch = math::epoch_id_for_block(block);

    let caller =
        authenticate_body(&state, &headers, &body, current_epoch, Role::Validator).await?;

    let submission: ManifestSubmission = serde_json::from_value(body)
        .map_err(|e| ApiError::data(format!("malformed manifest payload: {e}")))?;

    let manifest = state
        .manifest
        .submit_manifest(
            &caller.hotkey,
            submission.epoch_id,
            &submission.evidence_merkle_root,
        )
        .await?;
    Ok(Json(manifest))
}

/// `GET /manifest/stats?epoch_id=N` (public).
#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestStatsResponse {
    pub epoch_id: u64,
    pub manifest_count: usize,
    pub validators: Vec<String>,
}

pub async fn get_manifest_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ManifestStatsResponse>, ApiError> {
    let manifests = state
        .manifest
        .manifests_for_epoch(query.epoch_id)
        .await?;
    Ok(Json(ManifestStatsResponse {
        epoch_id: query.epoch_id,
        manifest_count: manifests.len(),
        validators: manifests
            .into_iter()
            .map(|m| m.validator_hotkey)
            .collect(),
    }))
}

/// `GET /manifest/validator/{hotkey}?epoch_id=N` (public).
pub async fn get_manifest_for_validator(
    State(state): State<AppState>,
    Path(hotkey): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Option<ValidatorManifest>>, ApiError> {
    let manifest = state
        .manifest
        .manifest_for_validator(&hotkey, query.epoch_id)
        .await?;
    Ok(Json(manifest))
}
