//! # Lead Assignment
//!
//! FIFO selection of the epoch's lead batch and the queue Merkle root.
//!
//! All validators receive the SAME ordered batch: the oldest (by
//! submission timestamp) at most 50 `pending_validation` leads at init
//! time. No shuffling, no per-validator subsets, no VRF. Leads ranked
//! 51+ keep their timestamps and with them their queue priority.

use serde_json::json;
use shared_crypto::MerkleTree;
use shared_types::{EpochAssignment, Hotkey, Lead, MAX_LEADS_PER_EPOCH, UNKNOWN_QUEUE_ROOT};
use uuid::Uuid;

/// Merkle root over the ordered lead id list.
///
/// Leaves are canonical JSON strings of the UUIDs, in assignment order.
/// An empty assignment has no tree; the `"unknown"` sentinel marks
/// "root not emitted" and must never be compared as a hash.
pub fn queue_merkle_root(lead_ids: &[Uuid]) -> String {
    if lead_ids.is_empty() {
        return UNKNOWN_QUEUE_ROOT.to_string();
    }
    let leaves: Vec<serde_json::Value> =
        lead_ids.iter().map(|id| json!(id.to_string())).collect();
    match MerkleTree::from_events(&leaves) {
        Ok(tree) => tree.root_hex(),
        // Unreachable with a non-empty list; keep the sentinel semantics.
        Err(_) => UNKNOWN_QUEUE_ROOT.to_string(),
    }
}

/// Build the epoch's assignment from the pending queue snapshot.
///
/// `pending` must already be FIFO-ordered oldest-first (the store
/// guarantees this); `pending_count` is the full queue depth at init
/// time.
pub fn build_assignment(
    epoch_id: u64,
    pending: &[Lead],
    pending_count: usize,
    validator_hotkeys: Vec<Hotkey>,
) -> EpochAssignment {
    let assigned_lead_ids: Vec<Uuid> = pending
        .iter()
        .take(MAX_LEADS_PER_EPOCH)
        .map(|l| l.lead_id)
        .collect();
    let queue_merkle_root = queue_merkle_root(&assigned_lead_ids);

    EpochAssignment {
        epoch_id,
        assigned_lead_ids,
        queue_merkle_root,
        validator_hotkeys,
        pending_lead_count: pending_count,
    }
}

/// Whether a lead belongs to an assignment.
pub fn lead_in_assignment(assignment: &EpochAssignment, lead_id: &Uuid) -> bool {
    assignment.assigned_lead_ids.contains(lead_id)
}
