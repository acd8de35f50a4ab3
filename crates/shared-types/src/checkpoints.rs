//! # Checkpoint Types
//!
//! A checkpoint commits a batch of buffered transparency events to a
//! single signed Merkle root, for upload to the permanent storage layer.

use serde::{Deserialize, Serialize};

/// The header the enclave signs for one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHeader {
    pub checkpoint_number: u64,
    pub event_count: usize,
    /// Hex Merkle root over canonical serializations of the batch, or the
    /// root of an empty sentinel batch for cadence-keeping checkpoints.
    pub merkle_root: String,
    /// Envelope timestamp of the earliest event in the batch.
    pub time_range_start: String,
    /// Envelope timestamp of the latest event in the batch.
    pub time_range_end: String,
}

/// A built checkpoint as returned from the enclave: signed header plus
/// the event batch and the full tree for inclusion proofs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointBundle {
    pub header: CheckpointHeader,
    /// Hex Ed25519 signature over the canonical JSON of `header`.
    pub signature: String,
    pub enclave_pubkey: String,
    /// The batched events (full log entries as JSON).
    pub events: Vec<serde_json::Value>,
    /// All tree levels as hex, leaves first.
    pub tree_levels: Vec<Vec<String>>,
}

/// The persisted record of a checkpoint, including its permanent-storage
/// transaction id once the upload is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub header: CheckpointHeader,
    pub signature: String,
    pub enclave_pubkey: String,
    pub tree_levels: Vec<Vec<String>>,
    /// Immutable transaction id assigned by the storage layer.
    pub arweave_tx_id: Option<String>,
}

/// Live statistics of the enclave event buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    pub buffered_events: usize,
    pub next_checkpoint_number: u64,
}
