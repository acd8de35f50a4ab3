//! Full-stack test harness.

use std::sync::Arc;

use lg_01_chain_client::{BlockPoller, SimChainClient};
use lg_02_registry::{RegistryCache, RegistryConfig};
use lg_03_store::MemoryStore;
use lg_04_transparency::{EnclaveSigner, LocalTeeService, TransparencyLog};
use lg_05_epoch_engine::{EpochLifecycle, LeadCache};
use lg_06_commit_reveal::{
    CommitRequest, CommitService, ManifestService, RevealOutcome, RevealRequest, RevealService,
    SubmissionReceipt, SubmissionService, CommitRevealError,
};
use lg_07_consensus::{ConsensusConfig, ConsensusService, LeadOutcome};
use lg_09_tasks::{DeregisteredSweep, EpochMonitor};
use serde_json::json;
use shared_crypto::{commitment_hash, Ed25519KeyPair};
use shared_types::{Decision, Neuron, RateLimitConfig, EPOCH_DURATION_BLOCKS};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A neuron to register on the simulated chain.
#[derive(Debug, Clone)]
pub struct TestNeuron {
    pub hotkey: String,
    pub v_trust: f64,
    pub stake: f64,
    pub validator: bool,
}

impl TestNeuron {
    pub fn validator(hotkey: &str, v_trust: f64, stake: f64) -> Self {
        Self {
            hotkey: hotkey.to_string(),
            v_trust,
            stake,
            validator: true,
        }
    }

    pub fn miner(hotkey: &str) -> Self {
        Self {
            hotkey: hotkey.to_string(),
            v_trust: 0.0,
            stake: 10.0,
            validator: false,
        }
    }
}

/// The wired gateway stack under test.
pub struct TestNet {
    pub sim: Arc<SimChainClient>,
    pub store: Arc<MemoryStore>,
    pub registry: Arc<RegistryCache>,
    pub log: Arc<TransparencyLog>,
    pub lifecycle: Arc<EpochLifecycle>,
    pub consensus: Arc<ConsensusService>,
    pub submission: Arc<SubmissionService>,
    pub commit: Arc<CommitService>,
    pub reveal: Arc<RevealService>,
    pub manifest: Arc<ManifestService>,
    monitor: Mutex<EpochMonitor>,
}

impl TestNet {
    /// Build the stack with the given neuron set registered.
    pub async fn new(neurons: &[TestNeuron]) -> Self {
        let store = Arc::new(MemoryStore::new());

        let sim = Arc::new(SimChainClient::new(0));
        sim.set_neurons(
            neurons
                .iter()
                .enumerate()
                .map(|(i, n)| Neuron {
                    hotkey: n.hotkey.clone(),
                    uid: i as u16,
                    stake: n.stake,
                    validator_trust: n.v_trust,
                    active: true,
                    validator_permit: n.validator,
                })
                .collect(),
        );
        let poller = Arc::new(BlockPoller::new(sim.clone()));
        let registry = Arc::new(RegistryCache::new(sim.clone(), RegistryConfig::new(401)));

        let signer = EnclaveSigner::new(
            Ed25519KeyPair::from_seed([42; 32]),
            "testnet-code-hash".to_string(),
            None,
            0,
        );
        let (tee, restart) = LocalTeeService::boot(signer);
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(TransparencyLog::new(
            tee,
            store.clone(),
            dir.path().join("fallback.jsonl"),
        ));
        std::mem::forget(dir);
        log.persist_entry(restart).await.unwrap();

        let lifecycle = Arc::new(EpochLifecycle::new(
            store.clone(),
            registry.clone(),
            log.clone(),
            Arc::new(LeadCache::new()),
        ));
        let consensus = Arc::new(ConsensusService::new(
            store.clone(),
            registry.clone(),
            log.clone(),
            ConsensusConfig::default(),
        ));
        let submission = Arc::new(SubmissionService::new(
            store.clone(),
            log.clone(),
            RateLimitConfig::default(),
        ));
        let commit = Arc::new(CommitService::new(
            store.clone(),
            log.clone(),
            lifecycle.clone(),
        ));
        let reveal = Arc::new(RevealService::new(store.clone(), log.clone()));
        let manifest = Arc::new(ManifestService::new(store.clone()));

        let sweep = Arc::new(DeregisteredSweep::new(
            store.clone(),
            registry.clone(),
            log.clone(),
        ));
        let monitor = Mutex::new(EpochMonitor::new(
            poller,
            lifecycle.clone(),
            consensus.clone(),
            registry.clone(),
            sweep,
        ));

        Self {
            sim,
            store,
            registry,
            log,
            lifecycle,
            consensus,
            submission,
            commit,
            reveal,
            manifest,
            monitor,
        }
    }

    /// Move the chain to `block` and run one monitor tick on it.
    pub async fn observe_block(&self, block: u64) {
        self.sim.set_block(block);
        self.monitor.lock().await.on_block(block).await;
    }

    /// First block of an epoch.
    pub fn epoch_start(epoch_id: u64) -> u64 {
        epoch_id * EPOCH_DURATION_BLOCKS
    }

    /// Submit a lead with deterministic fingerprints derived from the
    /// slugs.
    pub async fn submit_lead(
        &self,
        miner: &str,
        email: &str,
        profile_slug: &str,
        company_slug: &str,
    ) -> Result<SubmissionReceipt, CommitRevealError> {
        self.submission
            .submit(
                miner,
                json!({
                    "email": email,
                    "linkedin_url": format!("https://www.linkedin.com/in/{profile_slug}/"),
                    "company_linkedin_url":
                        format!("https://www.linkedin.com/company/{company_slug}/"),
                    "company": company_slug,
                }),
            )
            .await
    }

    /// File a commit with hashes derived from the eventual reveal
    /// values.
    pub async fn commit_decision(
        &self,
        validator: &str,
        lead_id: Uuid,
        epoch_id: u64,
        block: u64,
        decision: Decision,
        rep_score: u32,
        reason: &str,
        salt: &str,
    ) -> Result<Uuid, CommitRevealError> {
        self.commit
            .commit(
                validator,
                CommitRequest {
                    lead_id,
                    epoch_id,
                    decision_hash: commitment_hash(decision.as_str(), salt),
                    rep_score_hash: commitment_hash(&rep_score.to_string(), salt),
                    rejection_reason_hash: commitment_hash(reason, salt),
                    evidence_blob: json!({"is_icp_multiplier": 1.0}),
                },
                block,
            )
            .await
    }

    /// Reveal and run the eager consensus update, mirroring the HTTP
    /// handler's orchestration.
    pub async fn reveal_decision(
        &self,
        validator: &str,
        evidence_id: Uuid,
        epoch_id: u64,
        block: u64,
        decision: Decision,
        rep_score: u32,
        reason: &str,
        salt: &str,
    ) -> Result<(RevealOutcome, Option<LeadOutcome>), CommitRevealError> {
        let outcome = self
            .reveal
            .reveal(
                validator,
                RevealRequest {
                    evidence_id,
                    epoch_id,
                    decision,
                    rep_score,
                    rejection_reason: reason.to_string(),
                    salt: salt.to_string(),
                },
                block,
            )
            .await?;
        let consensus = match &outcome {
            RevealOutcome::Revealed { lead_id } => Some(
                self.consensus
                    .update_lead(lead_id, epoch_id)
                    .await
                    .expect("eager consensus update"),
            ),
            RevealOutcome::AlreadyRevealed { .. } => None,
        };
        Ok((outcome, consensus))
    }
}
