//! # Epoch Arithmetic
//!
//! Pure block-to-epoch math and the phase-window predicates every
//! ingress gate shares. Windows are closed under missed polls: each
//! predicate is a pure function of the block height, so a late observer
//! reaches the same verdict as a punctual one.

use shared_types::{
    COMMIT_WINDOW_END, CONSENSUS_WINDOW_END, CONSENSUS_WINDOW_START, EPOCH_DURATION_BLOCKS,
    MINER_SWEEP_BLOCK, PREFETCH_WINDOW_START, REVEAL_WINDOW_END,
};

/// Epoch containing a block.
pub fn epoch_id_for_block(block: u64) -> u64 {
    block / EPOCH_DURATION_BLOCKS
}

/// Position of a block inside its epoch, in `[0, 360)`.
pub fn block_within_epoch(block: u64) -> u64 {
    block % EPOCH_DURATION_BLOCKS
}

/// First block of an epoch.
pub fn epoch_start_block(epoch_id: u64) -> u64 {
    epoch_id * EPOCH_DURATION_BLOCKS
}

/// Whether commits for `epoch_id` are accepted at `block`.
pub fn in_commit_window(epoch_id: u64, block: u64) -> bool {
    epoch_id_for_block(block) == epoch_id && block_within_epoch(block) <= COMMIT_WINDOW_END
}

/// Outcome of checking a reveal against the protocol windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealWindow {
    /// Inside epoch `N+1`, block `[0, 328]`.
    Open,
    /// Still inside the validation epoch; revealing now would leak
    /// decisions into the open commit phase.
    SameEpoch,
    /// Epoch `N+2` or later; the window expired.
    Expired,
    /// Inside epoch `N+1` but past block 328.
    PastCutoff,
}

impl RevealWindow {
    /// Check a reveal for evidence from `evidence_epoch` at `block`.
    pub fn check(evidence_epoch: u64, block: u64) -> Self {
        let current_epoch = epoch_id_for_block(block);
        if current_epoch <= evidence_epoch {
            return RevealWindow::SameEpoch;
        }
        if current_epoch > evidence_epoch + 1 {
            return RevealWindow::Expired;
        }
        if block_within_epoch(block) > REVEAL_WINDOW_END {
            return RevealWindow::PastCutoff;
        }
        RevealWindow::Open
    }

    pub fn is_open(self) -> bool {
        self == RevealWindow::Open
    }
}

/// Whether `block` sits inside the batch-consensus trigger window of the
/// epoch FOLLOWING `epoch_id`.
pub fn in_consensus_window(epoch_id: u64, block: u64) -> bool {
    let within = block_within_epoch(block);
    epoch_id_for_block(block) == epoch_id + 1
        && (CONSENSUS_WINDOW_START..=CONSENSUS_WINDOW_END).contains(&within)
}

/// Whether `block` is the sweep block of its epoch.
pub fn at_sweep_block(block: u64) -> bool {
    block_within_epoch(block) == MINER_SWEEP_BLOCK
}

/// Whether `block` is inside its epoch's prefetch window.
pub fn in_prefetch_window(block: u64) -> bool {
    block_within_epoch(block) >= PREFETCH_WINDOW_START
}
