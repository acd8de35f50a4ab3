//! # Validation Commit
//!
//! A validator binds itself to hidden per-lead values by filing their
//! hashes during the active window. The evidence blob rides along
//! privately; only the hashes enter the public log.

use std::sync::Arc;

use lg_03_store::{EvidenceStore, GatewayStore};
use lg_04_transparency::TransparencyLog;
use lg_05_epoch_engine::{assignment::lead_in_assignment, math, EpochLifecycle};
use serde::{Deserialize, Serialize};
use shared_types::{EventPayload, ValidationCommitPayload, ValidationEvidence};
use tracing::info;
use uuid::Uuid;

use crate::errors::CommitRevealError;

/// A validator's commit for one lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub lead_id: Uuid,
    pub epoch_id: u64,
    pub decision_hash: String,
    pub rep_score_hash: String,
    pub rejection_reason_hash: String,
    pub evidence_blob: serde_json::Value,
}

/// Commit ingress.
pub struct CommitService {
    store: Arc<dyn GatewayStore>,
    log: Arc<TransparencyLog>,
    lifecycle: Arc<EpochLifecycle>,
}

impl CommitService {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        log: Arc<TransparencyLog>,
        lifecycle: Arc<EpochLifecycle>,
    ) -> Self {
        Self {
            store,
            log,
            lifecycle,
        }
    }

    /// File one hashed commitment from an authenticated validator.
    pub async fn commit(
        &self,
        validator_hotkey: &str,
        request: CommitRequest,
        current_block: u64,
    ) -> Result<Uuid, CommitRevealError> {
        if !math::in_commit_window(request.epoch_id, current_block) {
            return Err(CommitRevealError::OutsideCommitWindow {
                epoch_id: request.epoch_id,
                block: current_block,
            });
        }

        let assignment = self
            .lifecycle
            .get_or_init_assignment(request.epoch_id)
            .await?;
        if !lead_in_assignment(&assignment, &request.lead_id) {
            return Err(CommitRevealError::NotAssigned(request.epoch_id));
        }

        if self
            .store
            .commit_exists(validator_hotkey, &request.lead_id, request.epoch_id)
            .await?
        {
            return Err(CommitRevealError::DuplicateCommit);
        }

        let evidence_id = Uuid::new_v4();
        self.store
            .insert_commit(ValidationEvidence {
                evidence_id,
                validator_hotkey: validator_hotkey.to_string(),
                lead_id: request.lead_id,
                epoch_id: request.epoch_id,
                decision_hash: request.decision_hash.clone(),
                rep_score_hash: request.rep_score_hash.clone(),
                rejection_reason_hash: request.rejection_reason_hash.clone(),
                evidence_blob: request.evidence_blob,
                decision: None,
                rep_score: None,
                rejection_reason: None,
                salt: None,
                v_trust: None,
                stake: None,
                revealed_ts: None,
            })
            .await?;

        self.log
            .log_event(EventPayload::ValidationCommit(ValidationCommitPayload {
                evidence_id,
                validator_hotkey: validator_hotkey.to_string(),
                lead_id: request.lead_id,
                epoch_id: request.epoch_id,
                decision_hash: request.decision_hash,
                rep_score_hash: request.rep_score_hash,
                rejection_reason_hash: request.rejection_reason_hash,
                nonce: Uuid::new_v4(),
            }))
            .await?;

        info!(
            %evidence_id,
            validator = validator_hotkey,
            lead = %request.lead_id,
            epoch_id = request.epoch_id,
            "validation commit filed"
        );
        Ok(evidence_id)
    }
}
