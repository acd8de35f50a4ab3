//! # Checkpoint Batcher
//!
//! Anchors the enclave's event buffer to permanent storage:
//!
//! 1. The enclave builds and signs a Merkle checkpoint over the buffer
//! 2. The batch is gzip-compressed and uploaded
//! 3. On confirmed upload an `ARWEAVE_CHECKPOINT` event enters the
//!    chain (and therefore the NEXT checkpoint's batch)
//! 4. Only then is the enclave buffer cleared
//!
//! The loop checks every 10 minutes and fires on the 3-hour cadence or
//! when the buffer crosses the emergency threshold. An empty buffer
//! still produces a signed checkpoint so the public cadence shows no
//! gaps.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lg_03_store::{CheckpointStore, GatewayStore};
use lg_04_transparency::arweave::{compress_events, upload_with_confirmation};
use lg_04_transparency::{PermanentStore, TransparencyLog};
use shared_types::{ArweaveCheckpointPayload, CheckpointRecord, EventPayload};
use tracing::{info, warn};

/// Cadence between checkpoint uploads.
pub const BATCH_INTERVAL_SECS: u64 = 3 * 60 * 60;

/// Loop check interval.
pub const CHECK_INTERVAL_SECS: u64 = 600;

/// Buffer size that forces an early checkpoint.
pub const EMERGENCY_BATCH_THRESHOLD: usize = 8_000;

/// The checkpoint batching worker.
pub struct CheckpointBatcher {
    store: Arc<dyn GatewayStore>,
    log: Arc<TransparencyLog>,
    permanent: Arc<dyn PermanentStore>,
}

impl CheckpointBatcher {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        log: Arc<TransparencyLog>,
        permanent: Arc<dyn PermanentStore>,
    ) -> Self {
        Self {
            store,
            log,
            permanent,
        }
    }

    /// Run the cadence loop forever.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut last_batch = Instant::now();
        loop {
            tokio::time::sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;

            let due = last_batch.elapsed() >= Duration::from_secs(BATCH_INTERVAL_SECS);
            let emergency = match self.log.tee().get_buffer_stats().await {
                Ok(stats) => stats.buffered_events >= EMERGENCY_BATCH_THRESHOLD,
                Err(e) => {
                    warn!(error = %e, "buffer stats unavailable");
                    false
                }
            };
            if !due && !emergency {
                continue;
            }
            if emergency && !due {
                warn!("emergency checkpoint: buffer over threshold");
            }

            match self.run_once().await {
                Ok(tx_id) => {
                    info!(tx_id = %tx_id, "checkpoint anchored");
                    last_batch = Instant::now();
                }
                // Events stay buffered; the next cadence window retries.
                Err(e) => warn!(error = %e, "checkpoint batch failed, will retry"),
            }
        }
    }

    /// One complete checkpoint cycle. Returns the storage tx id.
    pub async fn run_once(&self) -> anyhow::Result<String> {
        let bundle = self.log.tee().build_checkpoint().await?;
        let checkpoint_number = bundle.header.checkpoint_number;

        self.store
            .insert_checkpoint(CheckpointRecord {
                header: bundle.header.clone(),
                signature: bundle.signature.clone(),
                enclave_pubkey: bundle.enclave_pubkey.clone(),
                tree_levels: bundle.tree_levels.clone(),
                arweave_tx_id: None,
            })
            .await?;

        let compressed = compress_events(&bundle.events)?;
        let tx_id =
            upload_with_confirmation(&self.permanent, compressed, "application/gzip").await?;

        self.store
            .set_checkpoint_tx_id(checkpoint_number, &tx_id)
            .await?;

        // The checkpoint event itself rides the chain and lands in the
        // next batch.
        self.log
            .log_event(EventPayload::ArweaveCheckpoint(ArweaveCheckpointPayload {
                checkpoint_number,
                event_count: bundle.header.event_count,
                merkle_root: bundle.header.merkle_root.clone(),
                arweave_tx_id: tx_id.clone(),
                time_range_start: bundle.header.time_range_start.clone(),
                time_range_end: bundle.header.time_range_end.clone(),
            }))
            .await?;

        let cleared = self.log.tee().clear_buffer().await?;
        info!(
            checkpoint_number,
            events = bundle.header.event_count,
            cleared,
            "checkpoint cycle complete"
        );
        Ok(tx_id)
    }
}
