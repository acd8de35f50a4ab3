//! # Block Poller
//!
//! Combines the chain client with the block cache: every read tries the
//! RPC under a timeout, records successes, and falls back to time-based
//! estimation when the RPC fails.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::block_cache::BlockCache;
use crate::errors::ChainError;
use crate::ports::ChainClient;
use crate::CHAIN_RPC_TIMEOUT_SECS;

/// Resilient current-block reads over any `ChainClient`.
pub struct BlockPoller {
    client: Arc<dyn ChainClient>,
    cache: BlockCache,
}

impl BlockPoller {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            cache: BlockCache::new(),
        }
    }

    /// Current block height: RPC first, cached estimation second.
    pub async fn current_block(&self) -> Result<u64, ChainError> {
        let attempt = tokio::time::timeout(
            Duration::from_secs(CHAIN_RPC_TIMEOUT_SECS),
            self.client.get_current_block(),
        )
        .await;

        match attempt {
            Ok(Ok(height)) => {
                self.cache.record(height);
                Ok(height)
            }
            Ok(Err(e)) => self.estimate_after(e),
            Err(_) => self.estimate_after(ChainError::Timeout(CHAIN_RPC_TIMEOUT_SECS)),
        }
    }

    fn estimate_after(&self, cause: ChainError) -> Result<u64, ChainError> {
        match self.cache.estimate() {
            Some(height) => {
                warn!(
                    estimated_block = height,
                    %cause,
                    "chain RPC unavailable, using cached block estimation"
                );
                Ok(height)
            }
            None => Err(ChainError::NoCachedBlock),
        }
    }

    /// The underlying client, for callers that need the metagraph.
    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }
}
