//! # Epoch Monitor
//!
//! Polls the chain's block number every 12 seconds (the chain's block
//! time) and feeds it to the epoch tracker. Polling, never a
//! subscription: long-lived subscriptions reconnect badly, a poll
//! cannot.
//!
//! Every tracker action is executed here; failures release the claim so
//! the next poll retries, and no failure is fatal to the loop.

use std::sync::Arc;
use std::time::Duration;

use lg_01_chain_client::BlockPoller;
use lg_02_registry::RegistryCache;
use lg_05_epoch_engine::{lifecycle::CREATED_BY_MONITOR, EpochAction, EpochLifecycle, EpochTracker};
use lg_07_consensus::ConsensusService;
use shared_types::BLOCK_TIME_SECS;
use tracing::{debug, warn};

use crate::sweep::DeregisteredSweep;

/// Back-off after a chain polling error.
const POLL_ERROR_DELAY_SECS: u64 = 30;

/// The block-driven heart of the gateway.
pub struct EpochMonitor {
    poller: Arc<BlockPoller>,
    lifecycle: Arc<EpochLifecycle>,
    consensus: Arc<ConsensusService>,
    registry: Arc<RegistryCache>,
    sweep: Arc<DeregisteredSweep>,
    tracker: EpochTracker,
}

impl EpochMonitor {
    pub fn new(
        poller: Arc<BlockPoller>,
        lifecycle: Arc<EpochLifecycle>,
        consensus: Arc<ConsensusService>,
        registry: Arc<RegistryCache>,
        sweep: Arc<DeregisteredSweep>,
    ) -> Self {
        Self {
            poller,
            lifecycle,
            consensus,
            registry,
            sweep,
            tracker: EpochTracker::new(),
        }
    }

    /// Run the polling loop forever.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            match self.poller.current_block().await {
                Ok(block) => {
                    self.on_block(block).await;
                    tokio::time::sleep(Duration::from_secs(BLOCK_TIME_SECS)).await;
                }
                Err(e) => {
                    warn!(error = %e, "block poll failed, backing off");
                    tokio::time::sleep(Duration::from_secs(POLL_ERROR_DELAY_SECS)).await;
                }
            }
        }
    }

    /// Process one observed block. Public for the integration suite,
    /// which drives blocks directly instead of sleeping.
    pub async fn on_block(&mut self, block: u64) {
        debug!(block, "epoch monitor tick");
        for action in self.tracker.on_block(block) {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: EpochAction) {
        match action {
            EpochAction::Initialize(epoch_id) => {
                match self
                    .lifecycle
                    .initialize_epoch(epoch_id, CREATED_BY_MONITOR)
                    .await
                {
                    Ok(_) => {
                        self.tracker.complete_initialize(epoch_id);
                        // A fresh epoch means a fresh metagraph; warm it
                        // off the hot path.
                        let registry = Arc::clone(&self.registry);
                        tokio::spawn(async move { registry.warm(epoch_id).await });
                    }
                    Err(e) => {
                        warn!(epoch_id, error = %e, "epoch initialization failed, will retry");
                        self.tracker.fail_initialize(epoch_id);
                    }
                }
            }
            EpochAction::EndValidation(epoch_id) => {
                match self.lifecycle.end_validation(epoch_id).await {
                    Ok(()) => self.tracker.complete_end_validation(epoch_id),
                    Err(e) => {
                        warn!(epoch_id, error = %e, "epoch close failed, will retry");
                        self.tracker.fail_end_validation(epoch_id);
                    }
                }
            }
            EpochAction::BatchConsensus(epoch_id) => {
                match self.consensus.run_batch(epoch_id).await {
                    Ok(_) => self.tracker.complete_consensus(epoch_id),
                    Err(e) => {
                        warn!(epoch_id, error = %e, "batch consensus failed, will retry");
                        self.tracker.fail_consensus(epoch_id);
                    }
                }
            }
            EpochAction::Sweep(epoch_id) => {
                if let Err(e) = self.sweep.run(epoch_id).await {
                    warn!(epoch_id, error = %e, "deregistered-miner sweep failed");
                    self.tracker.fail_sweep(epoch_id);
                }
            }
            EpochAction::Prefetch(epoch_id) => {
                if let Err(e) = self.lifecycle.prefetch(epoch_id).await {
                    warn!(epoch_id, error = %e, "assignment prefetch failed, will retry");
                    self.tracker.fail_prefetch(epoch_id);
                }
            }
        }
    }
}
