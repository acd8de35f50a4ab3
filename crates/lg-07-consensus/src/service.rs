//! # Consensus Service
//!
//! Applies the weighted aggregate to lead rows and the transparency log.
//!
//! ## Concurrency
//!
//! Eager per-reveal updates and the block-330 batch pass may touch the
//! same lead; both must hold the per-lead lease before writing. A busy
//! lease skips the update (the batch pass is canonical and will land).
//!
//! ## Accounting
//!
//! A consensus deny increments the miner's rejection counter exactly
//! once: only on the transition INTO `Denied`, via the failed-slot path
//! that never re-counts the submission.

use std::sync::Arc;
use std::time::Duration;

use lg_02_registry::RegistryCache;
use lg_03_store::{
    CounterStore, EvidenceStore, GatewayStore, LeadStore, TransparencyLogStore,
};
use lg_04_transparency::TransparencyLog;
use lg_05_epoch_engine::lifecycle::assignment_from_entry;
use shared_types::{
    ConsensusResultPayload, Decision, EventPayload, LeadStatus, MetagraphSnapshot,
    ValidationEvidence,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::errors::ConsensusError;

/// Apply retry policy.
const APPLY_ATTEMPTS: u32 = 3;

/// Consensus policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct ConsensusConfig {
    /// Whether a lead that received zero reveals counts against its
    /// miner's rejection cap. The protocol default is `false`: the lead
    /// simply re-enters the queue.
    pub count_unrevealed_as_rejection: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            count_unrevealed_as_rejection: false,
        }
    }
}

/// What happened to one lead during a consensus pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadOutcome {
    Applied { decision: Decision },
    /// No revealed rows; the lead returned to the pending queue.
    ZeroReveals,
    /// Another task holds the lead's lease.
    LeaseBusy,
}

/// Stake-weighted consensus over the evidence store.
pub struct ConsensusService {
    store: Arc<dyn GatewayStore>,
    registry: Arc<RegistryCache>,
    log: Arc<TransparencyLog>,
    config: ConsensusConfig,
}

impl ConsensusService {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        registry: Arc<RegistryCache>,
        log: Arc<TransparencyLog>,
        config: ConsensusConfig,
    ) -> Self {
        Self {
            store,
            registry,
            log,
            config,
        }
    }

    /// Recompute and apply consensus for one lead. Used eagerly on each
    /// reveal and by the canonical batch pass.
    pub async fn update_lead(
        &self,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<LeadOutcome, ConsensusError> {
        if !self.store.try_acquire_lead_lease(lead_id).await? {
            return Ok(LeadOutcome::LeaseBusy);
        }
        let result = self.update_lead_locked(lead_id, epoch_id).await;
        self.store.release_lead_lease(lead_id).await?;
        result
    }

    async fn update_lead_locked(
        &self,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<LeadOutcome, ConsensusError> {
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or(ConsensusError::LeadNotFound(*lead_id))?;

        // Weights come from the snapshot captured for the consensus
        // computation, which runs during the following epoch.
        let metagraph = self.registry.get_metagraph(epoch_id + 1).await?;
        let rows = self.weighted_rows(lead_id, epoch_id, &metagraph).await?;

        let Some(agg) = aggregate(&rows) else {
            // Zero reveals: back to the queue, stale fields cleared,
            // timestamps (and with them FIFO priority) untouched.
            if lead.status == LeadStatus::Validating {
                self.apply_with_retry(lead_id, LeadStatus::PendingValidation, None, None)
                    .await?;
                if self.config.count_unrevealed_as_rejection {
                    self.store
                        .resolve_slot(&lead.miner_hotkey, true)
                        .await?;
                }
                info!(%lead_id, epoch_id, "zero reveals, lead re-queued");
            }
            return Ok(LeadOutcome::ZeroReveals);
        };

        let status = match agg.final_decision {
            Decision::Approve => LeadStatus::Approved,
            Decision::Deny => LeadStatus::Denied,
        };
        let previously_denied = lead.status == LeadStatus::Denied;
        let snapshot = agg.snapshot(epoch_id);

        self.apply_with_retry(lead_id, status, Some(snapshot), agg.icp_multiplier)
            .await?;

        // Rejection accounting fires once, on the transition into Denied.
        if agg.final_decision == Decision::Deny && !previously_denied {
            self.store.resolve_slot(&lead.miner_hotkey, true).await?;
        } else if agg.final_decision == Decision::Approve && !previously_denied
            && lead.status == LeadStatus::Validating
        {
            self.store.resolve_slot(&lead.miner_hotkey, false).await?;
        }

        self.log
            .log_event(EventPayload::ConsensusResult(ConsensusResultPayload {
                lead_id: *lead_id,
                epoch_id,
                final_decision: agg.final_decision,
                final_rep_score: agg.final_rep_score,
                primary_rejection_reason: agg.primary_rejection_reason.clone(),
                validator_count: agg.validator_count,
                consensus_weight: agg.consensus_weight,
                approval_ratio: agg.approval_ratio,
                email_hash: lead.email_hash.clone(),
                linkedin_combo_hash: lead.linkedin_combo_hash.clone(),
                is_icp_multiplier: agg.icp_multiplier,
            }))
            .await?;

        info!(
            %lead_id,
            epoch_id,
            decision = agg.final_decision.as_str(),
            ratio = agg.approval_ratio,
            validators = agg.validator_count,
            "consensus applied"
        );
        Ok(LeadOutcome::Applied {
            decision: agg.final_decision,
        })
    }

    /// The canonical pass over an entire epoch at block 330 of the
    /// following epoch. Recomputes every assigned lead, capturing
    /// reveals the eager path never saw.
    pub async fn run_batch(&self, epoch_id: u64) -> Result<usize, ConsensusError> {
        let Some(entry) = self.log.store().epoch_initialization(epoch_id).await? else {
            warn!(epoch_id, "no initialization event, skipping batch consensus");
            return Ok(0);
        };
        let assignment = assignment_from_entry(&entry)
            .map_err(|_| ConsensusError::BadAssignment(epoch_id))?;

        let mut applied = 0;
        for lead_id in &assignment.assigned_lead_ids {
            match self.update_lead(lead_id, epoch_id).await {
                Ok(LeadOutcome::Applied { .. }) => applied += 1,
                Ok(_) => {}
                // One bad lead must not starve the rest of the batch.
                Err(e) => warn!(%lead_id, error = %e, "batch consensus lead failed"),
            }
        }
        info!(epoch_id, applied, total = assignment.assigned_lead_ids.len(), "batch consensus pass done");
        Ok(applied)
    }

    /// Load revealed rows and persist snapshot weights onto them.
    async fn weighted_rows(
        &self,
        lead_id: &Uuid,
        epoch_id: u64,
        metagraph: &MetagraphSnapshot,
    ) -> Result<Vec<ValidationEvidence>, ConsensusError> {
        let mut rows = self.store.revealed_for_lead(lead_id, epoch_id).await?;
        for row in &mut rows {
            if row.v_trust.is_none() || row.stake.is_none() {
                let (v_trust, stake) = metagraph
                    .neuron(&row.validator_hotkey)
                    .map(|n| (n.validator_trust, n.stake))
                    .unwrap_or((0.0, 0.0));
                row.v_trust = Some(v_trust);
                row.stake = Some(stake);
                self.store.apply_reveal(row.clone()).await?;
            }
        }
        Ok(rows)
    }

    async fn apply_with_retry(
        &self,
        lead_id: &Uuid,
        status: LeadStatus,
        snapshot: Option<shared_types::ConsensusSnapshot>,
        icp: Option<f64>,
    ) -> Result<(), ConsensusError> {
        let mut backoff = Duration::from_millis(200);
        for attempt in 1..=APPLY_ATTEMPTS {
            match self
                .store
                .apply_consensus(lead_id, status, snapshot.clone(), icp)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if attempt == APPLY_ATTEMPTS => return Err(e.into()),
                Err(e) => {
                    warn!(%lead_id, attempt, error = %e, "consensus apply retry");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
        Err(ConsensusError::RetriesExhausted(APPLY_ATTEMPTS))
    }
}
