//! # Transparency Event Envelope
//!
//! The closed set of event types, their payload shapes, and the signed
//! envelope that links every event into the enclave hash chain.
//!
//! ## Envelope
//!
//! ```text
//! signed_event = { event_type, timestamp, boot_id, monotonic_seq,
//!                  prev_event_hash, payload }
//! event_hash   = SHA-256( canonical_json(signed_event) )
//! log_entry    = { signed_event, event_hash, enclave_pubkey,
//!                  enclave_signature }
//! ```
//!
//! The enclave is the sole source of time: `timestamp` lives only in the
//! envelope and never inside a payload. Payload structs are defined without
//! timestamp fields so the rule holds by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Decision, Hotkey};

/// The closed set of transparency event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "SUBMISSION")]
    Submission,
    #[serde(rename = "VALIDATION_COMMIT")]
    ValidationCommit,
    #[serde(rename = "REVEAL")]
    Reveal,
    #[serde(rename = "EPOCH_INITIALIZATION")]
    EpochInitialization,
    #[serde(rename = "EPOCH_END")]
    EpochEnd,
    #[serde(rename = "EPOCH_INPUTS")]
    EpochInputs,
    #[serde(rename = "CONSENSUS_RESULT")]
    ConsensusResult,
    #[serde(rename = "ARWEAVE_CHECKPOINT")]
    ArweaveCheckpoint,
    #[serde(rename = "DEREGISTERED_MINER_REMOVAL")]
    DeregisteredMinerRemoval,
    #[serde(rename = "ENCLAVE_RESTART")]
    EnclaveRestart,
    #[serde(rename = "ANCHOR_ROOT")]
    AnchorRoot,
}

impl EventType {
    /// Canonical wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Submission => "SUBMISSION",
            EventType::ValidationCommit => "VALIDATION_COMMIT",
            EventType::Reveal => "REVEAL",
            EventType::EpochInitialization => "EPOCH_INITIALIZATION",
            EventType::EpochEnd => "EPOCH_END",
            EventType::EpochInputs => "EPOCH_INPUTS",
            EventType::ConsensusResult => "CONSENSUS_RESULT",
            EventType::ArweaveCheckpoint => "ARWEAVE_CHECKPOINT",
            EventType::DeregisteredMinerRemoval => "DEREGISTERED_MINER_REMOVAL",
            EventType::EnclaveRestart => "ENCLAVE_RESTART",
            EventType::AnchorRoot => "ANCHOR_ROOT",
        }
    }
}

// =============================================================================
// PAYLOAD SHAPES (one struct per event type; no timestamp fields)
// =============================================================================

/// Emitted when a miner's lead passes ingress gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub lead_id: Uuid,
    pub miner_hotkey: Hotkey,
    pub lead_blob_hash: String,
    pub email_hash: String,
    pub linkedin_combo_hash: String,
    /// Per-event UUID; the log store enforces uniqueness (replay defence).
    pub nonce: Uuid,
}

/// Emitted when a validator commits per-lead hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCommitPayload {
    pub evidence_id: Uuid,
    pub validator_hotkey: Hotkey,
    pub lead_id: Uuid,
    pub epoch_id: u64,
    pub decision_hash: String,
    pub rep_score_hash: String,
    pub rejection_reason_hash: String,
    pub nonce: Uuid,
}

/// Emitted when a reveal verifies. The salt is included so auditors can
/// re-derive the original commitment hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealPayload {
    pub evidence_id: Uuid,
    pub validator_hotkey: Hotkey,
    pub lead_id: Uuid,
    pub epoch_id: u64,
    pub decision: Decision,
    pub rep_score: u32,
    pub rejection_reason: String,
    pub salt: String,
    pub nonce: Uuid,
}

/// The epoch's materialized assignment. Exactly one per epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochInitializationPayload {
    pub epoch_id: u64,
    pub assigned_lead_ids: Vec<Uuid>,
    pub queue_merkle_root: String,
    pub validator_hotkeys: Vec<Hotkey>,
    pub pending_lead_count: usize,
    /// `"epoch_monitor"` on the normal path, `"leads_fallback"` when the
    /// ingress materialized the event at the boundary race.
    pub created_by: String,
}

/// Marks the end of an epoch's validation phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochEndPayload {
    pub epoch_id: u64,
    pub end_block: u64,
}

/// Summarises the inputs an epoch received while active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochInputsPayload {
    pub epoch_id: u64,
    pub assigned_lead_count: usize,
    pub commit_count: usize,
    pub validator_hotkeys: Vec<Hotkey>,
}

/// The public consensus outcome for one lead. Carries the aggregate only,
/// never per-validator decisions or evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResultPayload {
    pub lead_id: Uuid,
    pub epoch_id: u64,
    pub final_decision: Decision,
    pub final_rep_score: f64,
    pub primary_rejection_reason: String,
    pub validator_count: usize,
    pub consensus_weight: f64,
    pub approval_ratio: f64,
    pub email_hash: String,
    pub linkedin_combo_hash: String,
    pub is_icp_multiplier: Option<f64>,
}

/// Records a confirmed permanent-storage checkpoint upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArweaveCheckpointPayload {
    pub checkpoint_number: u64,
    pub event_count: usize,
    pub merkle_root: String,
    pub arweave_tx_id: String,
    pub time_range_start: String,
    pub time_range_end: String,
}

/// Per-hotkey removal counts from the deregistered-miner sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerRemoval {
    pub miner_hotkey: Hotkey,
    pub leads_removed: usize,
    pub evidence_removed: usize,
}

/// Summary of one deregistered-miner sweep run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeregisteredMinerRemovalPayload {
    pub epoch_id: u64,
    pub removals: Vec<MinerRemoval>,
    pub success: bool,
}

/// First event of every boot; links the new chain to the prior tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnclaveRestartPayload {
    /// Tip of the previous boot's chain, if the log store held one.
    pub previous_boot_tip: Option<String>,
    pub code_hash: String,
}

/// Low-frequency anchor of the latest checkpoint root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRootPayload {
    pub checkpoint_number: u64,
    pub merkle_root: String,
    pub arweave_tx_id: String,
}

/// Tagged union over all payload shapes.
///
/// One variant per event type, so a payload can never be emitted with a
/// missing field or under the wrong type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Submission(SubmissionPayload),
    ValidationCommit(ValidationCommitPayload),
    Reveal(RevealPayload),
    EpochInitialization(EpochInitializationPayload),
    EpochEnd(EpochEndPayload),
    EpochInputs(EpochInputsPayload),
    ConsensusResult(ConsensusResultPayload),
    ArweaveCheckpoint(ArweaveCheckpointPayload),
    DeregisteredMinerRemoval(DeregisteredMinerRemovalPayload),
    EnclaveRestart(EnclaveRestartPayload),
    AnchorRoot(AnchorRootPayload),
}

impl EventPayload {
    /// The event type this payload belongs to.
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Submission(_) => EventType::Submission,
            EventPayload::ValidationCommit(_) => EventType::ValidationCommit,
            EventPayload::Reveal(_) => EventType::Reveal,
            EventPayload::EpochInitialization(_) => EventType::EpochInitialization,
            EventPayload::EpochEnd(_) => EventType::EpochEnd,
            EventPayload::EpochInputs(_) => EventType::EpochInputs,
            EventPayload::ConsensusResult(_) => EventType::ConsensusResult,
            EventPayload::ArweaveCheckpoint(_) => EventType::ArweaveCheckpoint,
            EventPayload::DeregisteredMinerRemoval(_) => EventType::DeregisteredMinerRemoval,
            EventPayload::EnclaveRestart(_) => EventType::EnclaveRestart,
            EventPayload::AnchorRoot(_) => EventType::AnchorRoot,
        }
    }

    /// Serialize to the JSON value placed in the envelope.
    pub fn to_value(&self) -> serde_json::Value {
        // Serialization of plain structs into Value cannot fail.
        match self {
            EventPayload::Submission(p) => serde_json::to_value(p),
            EventPayload::ValidationCommit(p) => serde_json::to_value(p),
            EventPayload::Reveal(p) => serde_json::to_value(p),
            EventPayload::EpochInitialization(p) => serde_json::to_value(p),
            EventPayload::EpochEnd(p) => serde_json::to_value(p),
            EventPayload::EpochInputs(p) => serde_json::to_value(p),
            EventPayload::ConsensusResult(p) => serde_json::to_value(p),
            EventPayload::ArweaveCheckpoint(p) => serde_json::to_value(p),
            EventPayload::DeregisteredMinerRemoval(p) => serde_json::to_value(p),
            EventPayload::EnclaveRestart(p) => serde_json::to_value(p),
            EventPayload::AnchorRoot(p) => serde_json::to_value(p),
        }
        .unwrap_or(serde_json::Value::Null)
    }

    /// Reconstruct a typed payload from an envelope's type tag and value.
    pub fn from_value(
        event_type: EventType,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match event_type {
            EventType::Submission => EventPayload::Submission(serde_json::from_value(value)?),
            EventType::ValidationCommit => {
                EventPayload::ValidationCommit(serde_json::from_value(value)?)
            }
            EventType::Reveal => EventPayload::Reveal(serde_json::from_value(value)?),
            EventType::EpochInitialization => {
                EventPayload::EpochInitialization(serde_json::from_value(value)?)
            }
            EventType::EpochEnd => EventPayload::EpochEnd(serde_json::from_value(value)?),
            EventType::EpochInputs => EventPayload::EpochInputs(serde_json::from_value(value)?),
            EventType::ConsensusResult => {
                EventPayload::ConsensusResult(serde_json::from_value(value)?)
            }
            EventType::ArweaveCheckpoint => {
                EventPayload::ArweaveCheckpoint(serde_json::from_value(value)?)
            }
            EventType::DeregisteredMinerRemoval => {
                EventPayload::DeregisteredMinerRemoval(serde_json::from_value(value)?)
            }
            EventType::EnclaveRestart => {
                EventPayload::EnclaveRestart(serde_json::from_value(value)?)
            }
            EventType::AnchorRoot => EventPayload::AnchorRoot(serde_json::from_value(value)?),
        })
    }
}

// =============================================================================
// SIGNED ENVELOPE
// =============================================================================

/// The inner envelope that is canonicalised, hashed, and signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub event_type: EventType,
    /// ISO-8601 UTC, assigned by the enclave. The only timestamp anywhere
    /// in a log entry.
    pub timestamp: String,
    /// Fixed per enclave boot.
    pub boot_id: Uuid,
    /// Strictly increasing within a boot.
    pub monotonic_seq: u64,
    /// Hex SHA-256 of the previous entry, or the zero hash for a fresh
    /// chain's restart event.
    pub prev_event_hash: String,
    pub payload: serde_json::Value,
}

/// A complete hash-chained log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub signed_event: SignedEvent,
    /// Hex SHA-256 of the canonical JSON of `signed_event`.
    pub event_hash: String,
    /// Hex Ed25519 public key of the signing enclave.
    pub enclave_pubkey: String,
    /// Hex Ed25519 signature over the canonical bytes of `signed_event`.
    pub enclave_signature: String,
}

impl LogEntry {
    /// Typed view of the payload.
    pub fn payload(&self) -> Result<EventPayload, serde_json::Error> {
        EventPayload::from_value(self.signed_event.event_type, self.signed_event.payload.clone())
    }
}
