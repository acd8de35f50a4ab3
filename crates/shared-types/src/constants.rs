//! # Protocol Constants
//!
//! Block-window and sizing constants shared by the epoch engine, the
//! commit-reveal services, and the background tasks. These must agree
//! across every subsystem, so they live here and nowhere else.

/// Number of chain blocks in one validation epoch (~72 minutes at 12 s/block).
pub const EPOCH_DURATION_BLOCKS: u64 = 360;

/// Approximate chain block time in seconds.
pub const BLOCK_TIME_SECS: u64 = 12;

/// Maximum leads assigned per epoch. All validators receive the same batch.
pub const MAX_LEADS_PER_EPOCH: usize = 50;

/// Last block-within-epoch at which validation commits are accepted.
///
/// The protocol allows up to 355; we tighten to 350 to leave margin before
/// the validation-end transition at block 360.
pub const COMMIT_WINDOW_END: u64 = 350;

/// Last block-within-epoch (of epoch N+1) at which reveals for epoch N
/// are accepted.
pub const REVEAL_WINDOW_END: u64 = 328;

/// Batch consensus fires in blocks [328, 330] of the following epoch.
/// Widened to three blocks to absorb missed polls.
pub const CONSENSUS_WINDOW_START: u64 = 328;
pub const CONSENSUS_WINDOW_END: u64 = 330;

/// Block-within-epoch at which the deregistered-miner sweep runs.
pub const MINER_SWEEP_BLOCK: u64 = 357;

/// Prefetch of the next epoch's assignment starts at this block-within-epoch.
pub const PREFETCH_WINDOW_START: u64 = 351;

/// Blocks ignored for consensus triggering right after startup, giving the
/// registry cache time to warm.
pub const STARTUP_GRACE_BLOCKS: u64 = 10;

/// Epoch dedup sets are pruned to this many most-recent epochs.
pub const EPOCH_SET_CAPACITY: usize = 100;

/// Stake above which a permit-holding neuron is classified as a validator
/// even when the active flag is unset.
pub const VALIDATOR_STAKE_THRESHOLD: f64 = 500_000.0;

/// Inclusive upper bound for a revealed rep score.
pub const REP_SCORE_MAX: u32 = 48;

/// The rejection reason a validator must reveal alongside an approve vote.
pub const PASS_REASON: &str = "pass";

/// Queue-root sentinel meaning "root not emitted for this epoch".
/// Downstream verification must skip, never compare against it.
pub const UNKNOWN_QUEUE_ROOT: &str = "unknown";

/// Hex tip used for the first event of a chain with no predecessor.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_ordered() {
        assert!(COMMIT_WINDOW_END < EPOCH_DURATION_BLOCKS);
        assert!(REVEAL_WINDOW_END <= CONSENSUS_WINDOW_START);
        assert!(CONSENSUS_WINDOW_END < MINER_SWEEP_BLOCK);
        assert!(MINER_SWEEP_BLOCK < EPOCH_DURATION_BLOCKS);
        assert!(PREFETCH_WINDOW_START < EPOCH_DURATION_BLOCKS);
    }

    #[test]
    fn test_zero_hash_is_64_hex_chars() {
        assert_eq!(ZERO_HASH.len(), 64);
        assert!(ZERO_HASH.chars().all(|c| c == '0'));
    }
}
