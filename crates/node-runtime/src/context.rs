//! # Application Context
//!
//! Every component the gateway needs, constructed once at startup and
//! borrowed everywhere. No module-level globals: the context owns the
//! chain client, the registry cache, the stores, the enclave service,
//! and the protocol services, and hands `Arc` clones to the HTTP layer
//! and the background workers.

use std::sync::Arc;

use anyhow::Context as _;
use lg_01_chain_client::{BlockPoller, ChainClient, SimChainClient};
use lg_02_registry::{RegistryCache, RegistryConfig};
use lg_03_store::GatewayStore;
use lg_04_transparency::{
    compute_code_hash, ArweaveClient, EnclaveSigner, LocalTeeService, PermanentStore, TeeService,
    TransparencyLog,
};
use lg_05_epoch_engine::{EpochLifecycle, LeadCache};
use lg_06_commit_reveal::{CommitService, ManifestService, RevealService, SubmissionService};
use lg_07_consensus::{ConsensusConfig, ConsensusService};
use lg_08_gateway::AppState;
use lg_09_tasks::{AnchorTask, CheckpointBatcher, DeregisteredSweep, EpochMonitor, MetagraphWarmer};
use shared_crypto::Ed25519KeyPair;
use shared_types::RateLimitConfig;
use tracing::info;

use crate::adapters::storage::rocksdb_adapter::{RocksDbConfig, RocksStore};
use crate::config::NodeConfig;

/// The wired application.
pub struct AppContext {
    pub config: NodeConfig,
    pub store: Arc<dyn GatewayStore>,
    pub chain: Arc<dyn ChainClient>,
    pub poller: Arc<BlockPoller>,
    pub registry: Arc<RegistryCache>,
    pub tee: Arc<dyn TeeService>,
    pub log: Arc<TransparencyLog>,
    pub lifecycle: Arc<EpochLifecycle>,
    pub consensus: Arc<ConsensusService>,
    pub permanent: Arc<dyn PermanentStore>,
    pub state: AppState,
}

impl AppContext {
    /// Build the full context: open storage, boot the enclave (linking
    /// the hash chain to the previous boot), and wire the services.
    pub async fn build(config: NodeConfig) -> anyhow::Result<Self> {
        // Persistent store. The concrete handle coerces into each port
        // the components need.
        let rocks: Arc<RocksStore> = Arc::new(
            RocksStore::open(RocksDbConfig::at(
                config.data_dir.join("rocksdb").to_string_lossy().to_string(),
            ))
            .context("opening rocksdb store")?,
        );
        let store: Arc<dyn GatewayStore> = rocks.clone();
        let log_store: Arc<dyn lg_03_store::TransparencyLogStore> = rocks.clone();

        // Chain client. The substrate-backed client is wired by the
        // deployment; the simulator keeps local runs self-contained.
        let chain: Arc<dyn ChainClient> = Arc::new(SimChainClient::new(0));
        let poller = Arc::new(BlockPoller::new(Arc::clone(&chain)));

        let registry = Arc::new(RegistryCache::new(
            Arc::clone(&chain),
            RegistryConfig::new(config.netuid),
        ));

        // Enclave boot: previous tip from the store links the chains.
        let code_hash = compute_code_hash(std::path::Path::new("."))
            .unwrap_or_else(|_| "0".repeat(64));
        let keypair = match config.enclave_seed {
            Some(seed) => Ed25519KeyPair::from_seed(seed),
            None => Ed25519KeyPair::generate(),
        };
        let prev_tip = {
            use lg_03_store::TransparencyLogStore;
            store.latest_tip().await?
        };
        let next_checkpoint = {
            use lg_03_store::CheckpointStore;
            store
                .latest_checkpoint()
                .await?
                .map(|c| c.header.checkpoint_number + 1)
                .unwrap_or(0)
        };
        info!(
            prev_tip = prev_tip.as_deref().unwrap_or("none"),
            next_checkpoint, "booting enclave signer"
        );
        let signer = EnclaveSigner::new(keypair, code_hash, prev_tip, next_checkpoint);
        let (tee, restart_entry) = LocalTeeService::boot(signer);
        let tee: Arc<dyn TeeService> = tee;

        let log = Arc::new(TransparencyLog::new(
            Arc::clone(&tee),
            log_store,
            config.data_dir.join("log_fallback.jsonl"),
        ));
        // The restart event must land before anything else is logged.
        log.persist_entry(restart_entry).await?;

        let lead_cache = Arc::new(LeadCache::new());
        let lifecycle = Arc::new(EpochLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&log),
            lead_cache,
        ));
        let consensus = Arc::new(ConsensusService::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&log),
            ConsensusConfig::default(),
        ));

        let submission = Arc::new(SubmissionService::new(
            Arc::clone(&store),
            Arc::clone(&log),
            RateLimitConfig::default(),
        ));
        let commit = Arc::new(CommitService::new(
            Arc::clone(&store),
            Arc::clone(&log),
            Arc::clone(&lifecycle),
        ));
        let reveal = Arc::new(RevealService::new(Arc::clone(&store), Arc::clone(&log)));
        let manifest = Arc::new(ManifestService::new(Arc::clone(&store)));

        let permanent: Arc<dyn PermanentStore> =
            Arc::new(ArweaveClient::new(config.arweave_url.clone()));

        let state = AppState {
            store: Arc::clone(&store),
            registry: Arc::clone(&registry),
            poller: Arc::clone(&poller),
            tee: Arc::clone(&tee),
            lifecycle: Arc::clone(&lifecycle),
            submission,
            commit,
            reveal,
            manifest,
            consensus: Arc::clone(&consensus),
        };

        Ok(Self {
            config,
            store,
            chain,
            poller,
            registry,
            tee,
            log,
            lifecycle,
            consensus,
            permanent,
            state,
        })
    }

    /// Spawn every background worker under supervision.
    pub fn spawn_workers(&self) {
        let poller = Arc::clone(&self.poller);
        let lifecycle = Arc::clone(&self.lifecycle);
        let consensus = Arc::clone(&self.consensus);
        let registry = Arc::clone(&self.registry);
        let store = Arc::clone(&self.store);
        let log = Arc::clone(&self.log);
        let permanent = Arc::clone(&self.permanent);

        let sweep = Arc::new(DeregisteredSweep::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&log),
        ));

        {
            let (poller, lifecycle, consensus, registry, sweep) = (
                Arc::clone(&poller),
                Arc::clone(&lifecycle),
                Arc::clone(&consensus),
                Arc::clone(&registry),
                Arc::clone(&sweep),
            );
            lg_09_tasks::spawn_supervised("epoch-monitor", move || {
                let monitor = EpochMonitor::new(
                    Arc::clone(&poller),
                    Arc::clone(&lifecycle),
                    Arc::clone(&consensus),
                    Arc::clone(&registry),
                    Arc::clone(&sweep),
                );
                monitor.run()
            });
        }

        {
            let (store, log, permanent) = (
                Arc::clone(&store),
                Arc::clone(&log),
                Arc::clone(&permanent),
            );
            lg_09_tasks::spawn_supervised("checkpoint-batcher", move || {
                CheckpointBatcher::new(
                    Arc::clone(&store),
                    Arc::clone(&log),
                    Arc::clone(&permanent),
                )
                .run()
            });
        }

        {
            let (store, log) = (Arc::clone(&store), Arc::clone(&log));
            lg_09_tasks::spawn_supervised("anchor", move || {
                AnchorTask::new(Arc::clone(&store), Arc::clone(&log)).run()
            });
        }

        {
            let (poller, registry) = (Arc::clone(&poller), Arc::clone(&registry));
            lg_09_tasks::spawn_supervised("metagraph-warmer", move || {
                MetagraphWarmer::new(Arc::clone(&poller), Arc::clone(&registry)).run()
            });
        }
    }
}
