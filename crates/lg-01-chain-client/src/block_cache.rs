//! # Block Cache
//!
//! Remembers the last block number the RPC returned and, when the RPC is
//! unreachable, estimates the current height from elapsed wall-clock time
//! at the chain's 12-second cadence. Estimation keeps the epoch state
//! machine moving through short outages; a gateway that freezes its block
//! clock would silently stop honoring reveal windows.

use std::time::Instant;

use parking_lot::Mutex;
use shared_types::BLOCK_TIME_SECS;

#[derive(Debug, Clone, Copy)]
struct KnownBlock {
    height: u64,
    at: Instant,
}

/// Thread-safe last-known-block cache with time-based estimation.
#[derive(Debug, Default)]
pub struct BlockCache {
    inner: Mutex<Option<KnownBlock>>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful RPC result.
    pub fn record(&self, height: u64) {
        *self.inner.lock() = Some(KnownBlock {
            height,
            at: Instant::now(),
        });
    }

    /// Estimate the current height from the cached block, or `None` if
    /// nothing was ever recorded.
    pub fn estimate(&self) -> Option<u64> {
        let known = (*self.inner.lock())?;
        let elapsed_blocks = known.at.elapsed().as_secs() / BLOCK_TIME_SECS;
        Some(known.height + elapsed_blocks)
    }

    /// The cached height without estimation.
    pub fn last_known(&self) -> Option<u64> {
        (*self.inner.lock()).map(|k| k.height)
    }
}
