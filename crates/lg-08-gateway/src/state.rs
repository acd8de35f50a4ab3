//! # Application State
//!
//! One context struct constructed at startup and shared by every
//! handler. No module-level globals anywhere in the gateway.

use std::sync::Arc;

use lg_01_chain_client::BlockPoller;
use lg_02_registry::RegistryCache;
use lg_03_store::GatewayStore;
use lg_04_transparency::TeeService;
use lg_05_epoch_engine::EpochLifecycle;
use lg_06_commit_reveal::{CommitService, ManifestService, RevealService, SubmissionService};
use lg_07_consensus::ConsensusService;

/// Shared handles for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GatewayStore>,
    pub registry: Arc<RegistryCache>,
    pub poller: Arc<BlockPoller>,
    pub tee: Arc<dyn TeeService>,
    pub lifecycle: Arc<EpochLifecycle>,
    pub submission: Arc<SubmissionService>,
    pub commit: Arc<CommitService>,
    pub reveal: Arc<RevealService>,
    pub manifest: Arc<ManifestService>,
    pub consensus: Arc<ConsensusService>,
}
