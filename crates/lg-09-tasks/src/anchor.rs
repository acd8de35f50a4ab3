//! # Anchor Task
//!
//! Once a day, writes the latest confirmed checkpoint root back into
//! the transparency log as an `ANCHOR_ROOT` event. The root is small
//! enough to also commit to an external chain for out-of-band tamper
//! detection; this task produces the canonical value to pin.

use std::sync::Arc;
use std::time::Duration;

use lg_03_store::{CheckpointStore, GatewayStore};
use lg_04_transparency::TransparencyLog;
use shared_types::{AnchorRootPayload, EventPayload};
use tracing::{info, warn};

/// Cadence between anchor emissions.
pub const ANCHOR_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// The daily anchor worker.
pub struct AnchorTask {
    store: Arc<dyn GatewayStore>,
    log: Arc<TransparencyLog>,
}

impl AnchorTask {
    pub fn new(store: Arc<dyn GatewayStore>, log: Arc<TransparencyLog>) -> Self {
        Self { store, log }
    }

    /// Run the daily loop forever.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            tokio::time::sleep(Duration::from_secs(ANCHOR_INTERVAL_SECS)).await;
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "anchor emission failed, next cadence retries");
            }
        }
    }

    /// Emit one `ANCHOR_ROOT` for the newest confirmed checkpoint.
    pub async fn run_once(&self) -> anyhow::Result<bool> {
        let Some(record) = self.store.latest_checkpoint().await? else {
            info!("no checkpoint yet, nothing to anchor");
            return Ok(false);
        };
        let Some(tx_id) = record.arweave_tx_id.clone() else {
            info!(
                checkpoint_number = record.header.checkpoint_number,
                "latest checkpoint unconfirmed, skipping anchor"
            );
            return Ok(false);
        };

        self.log
            .log_event(EventPayload::AnchorRoot(AnchorRootPayload {
                checkpoint_number: record.header.checkpoint_number,
                merkle_root: record.header.merkle_root.clone(),
                arweave_tx_id: tx_id,
            }))
            .await?;
        info!(
            checkpoint_number = record.header.checkpoint_number,
            "anchor root emitted"
        );
        Ok(true)
    }
}
