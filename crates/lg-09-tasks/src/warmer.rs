//! # Metagraph Warmer
//!
//! Safety net behind the monitor-triggered warm-ups: once a minute,
//! checks whether the epoch advanced and refreshes the registry cache
//! if the cache missed the transition (e.g. the monitor was wedged on a
//! failing initialization).

use std::sync::Arc;
use std::time::Duration;

use lg_01_chain_client::BlockPoller;
use lg_02_registry::RegistryCache;
use lg_05_epoch_engine::math;
use tracing::{debug, warn};

/// Check interval.
pub const WARM_CHECK_INTERVAL_SECS: u64 = 60;

/// The warm-up worker.
pub struct MetagraphWarmer {
    poller: Arc<BlockPoller>,
    registry: Arc<RegistryCache>,
}

impl MetagraphWarmer {
    pub fn new(poller: Arc<BlockPoller>, registry: Arc<RegistryCache>) -> Self {
        Self { poller, registry }
    }

    /// Run the check loop forever.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut last_epoch: Option<u64> = None;
        loop {
            tokio::time::sleep(Duration::from_secs(WARM_CHECK_INTERVAL_SECS)).await;
            let epoch = match self.poller.current_block().await {
                Ok(block) => math::epoch_id_for_block(block),
                Err(e) => {
                    warn!(error = %e, "warmer block poll failed");
                    continue;
                }
            };
            if last_epoch != Some(epoch) {
                debug!(epoch, "warming metagraph for new epoch");
                self.registry.warm(epoch).await;
                last_epoch = Some(epoch);
            }
        }
    }
}
