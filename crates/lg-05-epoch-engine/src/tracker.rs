//! # Epoch Tracker
//!
//! The per-block decision core of the epoch monitor. `on_block` is a
//! pure state transition: it inspects the block height and the dedup
//! sets and returns the actions the caller should attempt. The caller
//! reports back success or failure; failures restore the claim so the
//! next poll retries.
//!
//! All sets are bounded to the most recent `EPOCH_SET_CAPACITY` epochs,
//! so a long-running gateway never grows without bound.

use std::collections::BTreeSet;

use shared_types::{EPOCH_SET_CAPACITY, STARTUP_GRACE_BLOCKS};

use crate::math;

/// A transition the monitor should attempt for this block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochAction {
    /// Emit `EPOCH_INITIALIZATION` for the epoch.
    Initialize(u64),
    /// Emit `EPOCH_END` and `EPOCH_INPUTS` for the finished epoch.
    EndValidation(u64),
    /// Run the canonical batch-consensus pass for the epoch.
    BatchConsensus(u64),
    /// Run the deregistered-miner sweep (observed in this epoch).
    Sweep(u64),
    /// Prefetch the next epoch's assignment.
    Prefetch(u64),
}

/// Insert-ordered epoch set pruned to the most recent N entries.
#[derive(Debug, Default)]
struct BoundedEpochSet(BTreeSet<u64>);

impl BoundedEpochSet {
    fn contains(&self, epoch: u64) -> bool {
        self.0.contains(&epoch)
    }

    fn insert(&mut self, epoch: u64) {
        self.0.insert(epoch);
        while self.0.len() > EPOCH_SET_CAPACITY {
            if let Some(oldest) = self.0.iter().next().copied() {
                self.0.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, epoch: u64) {
        self.0.remove(&epoch);
    }
}

/// Block-driven epoch state machine.
#[derive(Debug, Default)]
pub struct EpochTracker {
    first_block_seen: Option<u64>,
    initializing: BoundedEpochSet,
    initialized: BoundedEpochSet,
    validation_ending: BoundedEpochSet,
    validation_ended: BoundedEpochSet,
    processing: BoundedEpochSet,
    consensus_done: BoundedEpochSet,
    sweep_done: BoundedEpochSet,
    prefetched: BoundedEpochSet,
}

impl EpochTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide which transitions this block calls for. Claims are taken
    /// for every returned action; report the outcome with the
    /// `complete_*` / `fail_*` methods.
    pub fn on_block(&mut self, block: u64) -> Vec<EpochAction> {
        let first = *self.first_block_seen.get_or_insert(block);
        let in_startup_grace = block < first + STARTUP_GRACE_BLOCKS;

        let epoch = math::epoch_id_for_block(block);
        let mut actions = Vec::new();

        // Check 1: initialize the current epoch.
        if !self.initialized.contains(epoch) && !self.initializing.contains(epoch) {
            self.initializing.insert(epoch);
            actions.push(EpochAction::Initialize(epoch));
        }

        // Check 2: close the previous epoch's validation phase.
        if epoch > 0 {
            let prev = epoch - 1;
            if !self.validation_ended.contains(prev) && !self.validation_ending.contains(prev) {
                self.validation_ending.insert(prev);
                actions.push(EpochAction::EndValidation(prev));
            }
        }

        // Check 3: batch consensus in blocks [328, 330], for the epoch
        // whose reveals just closed. Skipped during startup grace so the
        // registry cache can warm first.
        if epoch > 0 && !in_startup_grace {
            let target = epoch - 1;
            if math::in_consensus_window(target, block)
                && !self.consensus_done.contains(target)
                && !self.processing.contains(target)
            {
                self.processing.insert(target);
                actions.push(EpochAction::BatchConsensus(target));
            }
        }

        // Check 4: deregistered-miner sweep at block 357.
        if math::at_sweep_block(block) && !self.sweep_done.contains(epoch) {
            self.sweep_done.insert(epoch);
            actions.push(EpochAction::Sweep(epoch));
        }

        // Check 5: prefetch the next epoch's assignment in [351, 360).
        if math::in_prefetch_window(block) && !self.prefetched.contains(epoch + 1) {
            self.prefetched.insert(epoch + 1);
            actions.push(EpochAction::Prefetch(epoch + 1));
        }

        actions
    }

    /// Initialization succeeded (or the event already existed).
    pub fn complete_initialize(&mut self, epoch: u64) {
        self.initializing.remove(epoch);
        self.initialized.insert(epoch);
    }

    /// Initialization failed; the next poll retries.
    pub fn fail_initialize(&mut self, epoch: u64) {
        self.initializing.remove(epoch);
    }

    pub fn complete_end_validation(&mut self, epoch: u64) {
        self.validation_ending.remove(epoch);
        self.validation_ended.insert(epoch);
    }

    pub fn fail_end_validation(&mut self, epoch: u64) {
        self.validation_ending.remove(epoch);
    }

    pub fn complete_consensus(&mut self, epoch: u64) {
        self.processing.remove(epoch);
        self.consensus_done.insert(epoch);
    }

    pub fn fail_consensus(&mut self, epoch: u64) {
        self.processing.remove(epoch);
    }

    /// The sweep claim is taken eagerly; a failed sweep re-arms so a
    /// later poll inside the same epoch can retry.
    pub fn fail_sweep(&mut self, epoch: u64) {
        self.sweep_done.remove(epoch);
    }

    pub fn fail_prefetch(&mut self, epoch: u64) {
        self.prefetched.remove(epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::EPOCH_DURATION_BLOCKS;

    fn start(epoch: u64) -> u64 {
        epoch * EPOCH_DURATION_BLOCKS
    }

    #[test]
    fn test_initialize_claim_taken_once() {
        let mut t = EpochTracker::new();
        let actions = t.on_block(start(100));
        assert!(actions.contains(&EpochAction::Initialize(100)));

        // Claim held: the next poll does not re-attempt.
        assert!(!t.on_block(start(100) + 1).contains(&EpochAction::Initialize(100)));

        // Failure releases the claim.
        t.fail_initialize(100);
        assert!(t.on_block(start(100) + 2).contains(&EpochAction::Initialize(100)));

        // Success pins it.
        t.complete_initialize(100);
        assert!(!t.on_block(start(100) + 3).contains(&EpochAction::Initialize(100)));
    }

    #[test]
    fn test_end_validation_fires_for_previous_epoch() {
        let mut t = EpochTracker::new();
        t.on_block(start(101));
        // The first block of epoch 101 claims EndValidation(100).
        let actions = t.on_block(start(101) + 1);
        assert!(!actions.contains(&EpochAction::EndValidation(100)));
        t.complete_end_validation(100);
        assert!(!t.on_block(start(101) + 2).contains(&EpochAction::EndValidation(100)));
    }

    #[test]
    fn test_startup_grace_swallows_consensus_trigger() {
        // Gateway starts directly inside the consensus window.
        let mut t = EpochTracker::new();
        let at_window = start(101) + 328;
        let actions = t.on_block(at_window);
        assert!(!actions.iter().any(|a| matches!(a, EpochAction::BatchConsensus(_))));
    }

    #[test]
    fn test_batch_consensus_fires_in_window() {
        let mut t = EpochTracker::new();
        // Warm start well before the window so grace has elapsed.
        t.on_block(start(101));
        let actions = t.on_block(start(101) + 329);
        assert!(actions.contains(&EpochAction::BatchConsensus(100)));

        // Double-fire guard inside the widened window.
        t.complete_consensus(100);
        assert!(!t.on_block(start(101) + 330).contains(&EpochAction::BatchConsensus(100)));
    }

    #[test]
    fn test_consensus_retry_after_failure() {
        let mut t = EpochTracker::new();
        t.on_block(start(50));
        let block = start(101) + 329;
        // Move past grace with an earlier block.
        let actions = t.on_block(block);
        assert!(actions.contains(&EpochAction::BatchConsensus(100)));
        t.fail_consensus(100);
        assert!(t.on_block(block + 1).contains(&EpochAction::BatchConsensus(100)));
    }

    #[test]
    fn test_sweep_and_prefetch_claims() {
        let mut t = EpochTracker::new();
        let sweep_block = start(7) + 357;
        let actions = t.on_block(sweep_block);
        assert!(actions.contains(&EpochAction::Sweep(7)));
        assert!(actions.contains(&EpochAction::Prefetch(8)));

        // Same poll window, no duplicates.
        let again = t.on_block(sweep_block + 1);
        assert!(!again.contains(&EpochAction::Sweep(7)));
        assert!(!again.contains(&EpochAction::Prefetch(8)));
    }

    #[test]
    fn test_sets_stay_bounded() {
        let mut t = EpochTracker::new();
        for epoch in 0..(EPOCH_SET_CAPACITY as u64 + 50) {
            t.on_block(start(epoch));
            t.complete_initialize(epoch);
        }
        assert!(t.initialized.0.len() <= EPOCH_SET_CAPACITY);
    }
}
