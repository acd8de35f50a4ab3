//! # Reveal
//!
//! Deferred disclosure of committed values. The window is strict both
//! ways: revealing in the validation epoch would leak decisions into the
//! open commit phase, and revealing after epoch `N+1` block 328 would
//! let validators stall past consensus.
//!
//! The salt enters the public `REVEAL` event so anyone can re-derive the
//! original commitment hashes.

use std::sync::Arc;

use chrono::Utc;
use lg_03_store::{EvidenceStore, GatewayStore};
use lg_04_transparency::TransparencyLog;
use lg_05_epoch_engine::RevealWindow;
use serde::{Deserialize, Serialize};
use shared_crypto::{rep_score_commitment, verify_commitment};
use shared_types::{
    Decision, EventPayload, RevealPayload, ValidationEvidence, PASS_REASON, REP_SCORE_MAX,
};
use tracing::info;
use uuid::Uuid;

use crate::errors::CommitRevealError;

/// A validator's reveal for previously committed evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealRequest {
    pub evidence_id: Uuid,
    pub epoch_id: u64,
    pub decision: Decision,
    pub rep_score: u32,
    pub rejection_reason: String,
    pub salt: String,
}

/// Result of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    /// First reveal; the lead should get an eager consensus update.
    Revealed { lead_id: Uuid },
    /// Identical re-reveal; no state change.
    AlreadyRevealed { lead_id: Uuid },
}

impl RevealOutcome {
    pub fn lead_id(&self) -> Uuid {
        match self {
            RevealOutcome::Revealed { lead_id } | RevealOutcome::AlreadyRevealed { lead_id } => {
                *lead_id
            }
        }
    }
}

/// Reveal ingress.
pub struct RevealService {
    store: Arc<dyn GatewayStore>,
    log: Arc<TransparencyLog>,
}

impl RevealService {
    pub fn new(store: Arc<dyn GatewayStore>, log: Arc<TransparencyLog>) -> Self {
        Self { store, log }
    }

    /// Verify and apply one reveal from an authenticated validator.
    pub async fn reveal(
        &self,
        validator_hotkey: &str,
        request: RevealRequest,
        current_block: u64,
    ) -> Result<RevealOutcome, CommitRevealError> {
        let evidence = self
            .store
            .get_evidence(&request.evidence_id)
            .await?
            .ok_or(CommitRevealError::UnknownEvidence)?;
        if evidence.validator_hotkey != validator_hotkey {
            return Err(CommitRevealError::NotEvidenceOwner);
        }
        if request.epoch_id != evidence.epoch_id {
            return Err(CommitRevealError::RevealWindowClosed(format!(
                "evidence belongs to epoch {}, not {}",
                evidence.epoch_id, request.epoch_id
            )));
        }

        match RevealWindow::check(evidence.epoch_id, current_block) {
            RevealWindow::Open => {}
            RevealWindow::SameEpoch => {
                return Err(CommitRevealError::RevealWindowClosed(format!(
                    "cannot reveal during epoch {}; wait for epoch {}",
                    evidence.epoch_id,
                    evidence.epoch_id + 1
                )))
            }
            RevealWindow::Expired => {
                return Err(CommitRevealError::RevealWindowClosed(format!(
                    "reveal window expired; epoch {} evidence must be revealed in epoch {}",
                    evidence.epoch_id,
                    evidence.epoch_id + 1
                )))
            }
            RevealWindow::PastCutoff => {
                return Err(CommitRevealError::RevealWindowClosed(
                    "past block 328 of the reveal epoch".to_string(),
                ))
            }
        }

        if request.rep_score > REP_SCORE_MAX {
            return Err(CommitRevealError::RepScoreOutOfRange(request.rep_score));
        }
        let reason_is_pass = request.rejection_reason == PASS_REASON;
        if (request.decision == Decision::Approve) != reason_is_pass {
            return Err(CommitRevealError::BadReasonPairing);
        }

        // Idempotence: identical re-reveal succeeds without touching
        // state; a conflicting one is a data violation.
        if evidence.is_revealed() {
            let identical = evidence.decision == Some(request.decision)
                && evidence.rep_score == Some(request.rep_score)
                && evidence.rejection_reason.as_deref()
                    == Some(request.rejection_reason.as_str())
                && evidence.salt.as_deref() == Some(request.salt.as_str());
            return if identical {
                Ok(RevealOutcome::AlreadyRevealed {
                    lead_id: evidence.lead_id,
                })
            } else {
                Err(CommitRevealError::ConflictingReveal)
            };
        }

        // All three commitments must verify.
        if !verify_commitment(
            request.decision.as_str(),
            &request.salt,
            &evidence.decision_hash,
        ) {
            return Err(CommitRevealError::HashMismatch("decision"));
        }
        if rep_score_commitment(request.rep_score, &request.salt) != evidence.rep_score_hash {
            return Err(CommitRevealError::HashMismatch("rep_score"));
        }
        if !verify_commitment(
            &request.rejection_reason,
            &request.salt,
            &evidence.rejection_reason_hash,
        ) {
            return Err(CommitRevealError::HashMismatch("rejection_reason"));
        }

        let revealed = ValidationEvidence {
            decision: Some(request.decision),
            rep_score: Some(request.rep_score),
            rejection_reason: Some(request.rejection_reason.clone()),
            salt: Some(request.salt.clone()),
            revealed_ts: Some(Utc::now()),
            ..evidence
        };
        let lead_id = revealed.lead_id;
        self.store.apply_reveal(revealed).await?;

        self.log
            .log_event(EventPayload::Reveal(RevealPayload {
                evidence_id: request.evidence_id,
                validator_hotkey: validator_hotkey.to_string(),
                lead_id,
                epoch_id: request.epoch_id,
                decision: request.decision,
                rep_score: request.rep_score,
                rejection_reason: request.rejection_reason,
                salt: request.salt,
                nonce: Uuid::new_v4(),
            }))
            .await?;

        info!(
            evidence_id = %request.evidence_id,
            validator = validator_hotkey,
            decision = request.decision.as_str(),
            "reveal verified"
        );
        Ok(RevealOutcome::Revealed { lead_id })
    }
}
