//! # Core Domain Entities
//!
//! Defines the lead, evidence, epoch, and registry entities that flow
//! between the ingress, the epoch engine, and the consensus aggregator.
//!
//! ## Clusters
//!
//! - **Leads**: `Lead`, `LeadStatus`, `ConsensusSnapshot`
//! - **Epochs**: `EpochAssignment`
//! - **Evidence**: `ValidationEvidence`, `Decision`, `ValidatorManifest`
//! - **Registry**: `Neuron`, `MetagraphSnapshot`, `Role`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SS58-encoded account identity on the chain.
pub type Hotkey = String;

// =============================================================================
// CLUSTER A: LEADS
// =============================================================================

/// Lifecycle status of a lead.
///
/// The lifecycle advances `PendingValidation -> Validating ->
/// {Approved, Denied} -> Removed`. Two qualifications: a zero-reveal
/// epoch returns the lead to the queue, and the two verdicts may flip
/// into each other while reveals are still accumulating (the eager
/// update is provisional until the batch pass). Removal only happens
/// through the deregistered-miner sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    PendingValidation,
    Validating,
    Approved,
    Denied,
    Removed,
}

impl LeadStatus {
    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        use LeadStatus::*;
        matches!(
            (self, next),
            (PendingValidation, Validating)
                | (Validating, Approved)
                | (Validating, Denied)
                // Zero-reveal epochs send the lead back to the queue.
                | (Validating, PendingValidation)
                // Consensus refinement while reveals accumulate.
                | (Approved, Denied)
                | (Denied, Approved)
                | (PendingValidation, Removed)
                | (Validating, Removed)
                | (Denied, Removed)
        )
    }

    /// Statuses the deregistered-miner sweep considers non-final.
    pub fn is_sweepable(self) -> bool {
        matches!(
            self,
            LeadStatus::PendingValidation | LeadStatus::Validating | LeadStatus::Denied
        )
    }
}

/// Aggregate consensus outcome snapshotted onto a lead at epoch close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    pub epoch_id: u64,
    pub final_decision: Decision,
    pub final_rep_score: f64,
    pub primary_rejection_reason: String,
    pub validator_count: usize,
    pub consensus_weight: f64,
    pub approval_ratio: f64,
}

/// A submitted lead record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Unique lead identifier.
    pub lead_id: Uuid,
    /// Submitting miner's hotkey.
    pub miner_hotkey: Hotkey,
    /// Opaque structured record (email, LinkedIn URLs, firmographics).
    pub lead_blob: serde_json::Value,
    /// SHA-256 of the canonical serialization of `lead_blob`.
    pub lead_blob_hash: String,
    /// SHA-256 of the normalized lowercased email.
    pub email_hash: String,
    /// SHA-256 of `profile || "||" || company`; empty if either is missing.
    pub linkedin_combo_hash: String,
    pub status: LeadStatus,
    pub created_ts: DateTime<Utc>,
    /// Filled at consensus; cleared again if an epoch yields zero reveals.
    pub consensus_snapshot: Option<ConsensusSnapshot>,
    /// ICP multiplier chosen as the mode across approving validators.
    pub icp_multiplier: Option<f64>,
}

// =============================================================================
// CLUSTER B: EPOCHS
// =============================================================================

/// The materialized lead assignment for one epoch.
///
/// Emitted inside the `EPOCH_INITIALIZATION` event and immutable once
/// published. Every validator of the epoch receives exactly this ordered
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochAssignment {
    pub epoch_id: u64,
    /// At most `MAX_LEADS_PER_EPOCH` FIFO-oldest pending leads at init time.
    pub assigned_lead_ids: Vec<Uuid>,
    /// Merkle root over the ordered ID list, or the `"unknown"` sentinel.
    pub queue_merkle_root: String,
    /// Active validators at init time.
    pub validator_hotkeys: Vec<Hotkey>,
    /// Pending-queue depth observed at init time.
    pub pending_lead_count: usize,
}

// =============================================================================
// CLUSTER C: VALIDATION EVIDENCE
// =============================================================================

/// A validator's verdict on a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    /// Wire form used inside commitment hashes and event payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Deny => "deny",
        }
    }

    /// Parse the wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Decision::Approve),
            "deny" => Some(Decision::Deny),
            _ => None,
        }
    }
}

/// Per-validator, per-lead commit-reveal evidence row.
///
/// Rows are append-only until reveal. After reveal, all three hashes must
/// equal the SHA-256 of the revealed value concatenated with the salt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationEvidence {
    pub evidence_id: Uuid,
    pub validator_hotkey: Hotkey,
    pub lead_id: Uuid,
    pub epoch_id: u64,
    /// SHA-256 over `decision || salt`.
    pub decision_hash: String,
    /// SHA-256 over `str(rep_score) || salt`.
    pub rep_score_hash: String,
    /// SHA-256 over `rejection_reason || salt`.
    pub rejection_reason_hash: String,
    /// Opaque scoring evidence. Never revealed publicly.
    pub evidence_blob: serde_json::Value,
    /// Filled at reveal.
    pub decision: Option<Decision>,
    /// Filled at reveal; integer in `[0, REP_SCORE_MAX]`.
    pub rep_score: Option<u32>,
    /// Filled at reveal; must equal `"pass"` iff decision is approve.
    pub rejection_reason: Option<String>,
    /// Revealed hex salt.
    pub salt: Option<String>,
    /// Validator trust from the consensus-time metagraph snapshot.
    pub v_trust: Option<f64>,
    /// Stake from the consensus-time metagraph snapshot.
    pub stake: Option<f64>,
    pub revealed_ts: Option<DateTime<Utc>>,
}

impl ValidationEvidence {
    /// Whether this row has been revealed.
    pub fn is_revealed(&self) -> bool {
        self.decision.is_some()
    }
}

/// A validator's proof of epoch completion: a Merkle root over the ordered
/// IDs of the evidence rows it submitted for that epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorManifest {
    pub validator_hotkey: Hotkey,
    pub epoch_id: u64,
    pub evidence_merkle_root: String,
    pub evidence_count: usize,
    pub submitted_ts: DateTime<Utc>,
}

// =============================================================================
// CLUSTER D: REGISTRY
// =============================================================================

/// Role of a registered hotkey, derived from the metagraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Validator,
    Miner,
}

/// One registered neuron from the on-chain metagraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub hotkey: Hotkey,
    pub uid: u16,
    pub stake: f64,
    pub validator_trust: f64,
    pub active: bool,
    pub validator_permit: bool,
}

impl Neuron {
    /// A neuron is a validator iff it holds a permit and is either active
    /// or stakes above the threshold.
    pub fn role(&self) -> Role {
        let stake_override = self.stake > crate::constants::VALIDATOR_STAKE_THRESHOLD;
        if (self.active || stake_override) && self.validator_permit {
            Role::Validator
        } else {
            Role::Miner
        }
    }
}

/// An immutable snapshot of the metagraph, keyed by the epoch it was
/// fetched for. Published once and shared by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetagraphSnapshot {
    pub epoch_id: u64,
    pub netuid: u16,
    pub neurons: Vec<Neuron>,
}

impl MetagraphSnapshot {
    /// Look up a neuron by hotkey.
    pub fn neuron(&self, hotkey: &str) -> Option<&Neuron> {
        self.neurons.iter().find(|n| n.hotkey == hotkey)
    }

    /// Hotkeys of all validators in this snapshot.
    pub fn validator_hotkeys(&self) -> Vec<Hotkey> {
        self.neurons
            .iter()
            .filter(|n| n.role() == Role::Validator)
            .map(|n| n.hotkey.clone())
            .collect()
    }

    /// Whether a hotkey is registered at all.
    pub fn contains(&self, hotkey: &str) -> bool {
        self.neuron(hotkey).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neuron(active: bool, permit: bool, stake: f64) -> Neuron {
        Neuron {
            hotkey: "5Hotkey".to_string(),
            uid: 0,
            stake,
            validator_trust: 0.5,
            active,
            validator_permit: permit,
        }
    }

    #[test]
    fn test_role_active_with_permit_is_validator() {
        assert_eq!(neuron(true, true, 10.0).role(), Role::Validator);
    }

    #[test]
    fn test_role_stake_override_requires_permit() {
        assert_eq!(neuron(false, true, 600_000.0).role(), Role::Validator);
        assert_eq!(neuron(false, false, 600_000.0).role(), Role::Miner);
    }

    #[test]
    fn test_role_inactive_low_stake_is_miner() {
        assert_eq!(neuron(false, true, 499_999.0).role(), Role::Miner);
        assert_eq!(neuron(true, false, 10.0).role(), Role::Miner);
    }

    #[test]
    fn test_status_transitions() {
        use LeadStatus::*;
        assert!(PendingValidation.can_transition_to(Validating));
        assert!(Validating.can_transition_to(Approved));
        assert!(Validating.can_transition_to(Denied));
        assert!(Validating.can_transition_to(PendingValidation));
        // Verdicts stay revisable until the batch pass.
        assert!(Approved.can_transition_to(Denied));
        assert!(Denied.can_transition_to(Approved));
        // Approved leads are never swept or re-queued.
        assert!(!Approved.can_transition_to(Removed));
        assert!(!Approved.can_transition_to(PendingValidation));
        assert!(!Removed.can_transition_to(Validating));
    }

    #[test]
    fn test_decision_wire_form() {
        assert_eq!(Decision::Approve.as_str(), "approve");
        assert_eq!(Decision::parse("deny"), Some(Decision::Deny));
        assert_eq!(Decision::parse("maybe"), None);
    }
}
