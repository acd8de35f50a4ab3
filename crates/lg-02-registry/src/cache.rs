//! # Registry Cache Service
//!
//! Single-snapshot cache with claim-then-fetch refresh and stale
//! fallback. The lock only guards the pointer swap; snapshots are
//! immutable once published and shared by `Arc`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lg_01_chain_client::{ChainClient, ChainError, CHAIN_RPC_TIMEOUT_SECS, METAGRAPH_FETCH_ATTEMPTS};
use parking_lot::Mutex;
use shared_types::{MetagraphSnapshot, BLOCK_TIME_SECS, EPOCH_DURATION_BLOCKS};
use tracing::{info, warn};

use crate::classify::Classification;
use crate::errors::RegistryError;

/// Tunables for the registry cache.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub netuid: u16,
    /// Wall-clock age beyond which a snapshot is considered stale even if
    /// the epoch has not advanced. Defaults to one epoch duration.
    pub max_age: Duration,
    /// Cap for the inter-attempt exponential backoff.
    pub backoff_cap: Duration,
}

impl RegistryConfig {
    pub fn new(netuid: u16) -> Self {
        Self {
            netuid,
            max_age: Duration::from_secs(EPOCH_DURATION_BLOCKS * BLOCK_TIME_SECS),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

struct CacheState {
    snapshot: Option<Arc<MetagraphSnapshot>>,
    fetched_at: Instant,
    refresh_in_progress: bool,
}

/// Epoch-keyed metagraph cache.
pub struct RegistryCache {
    client: Arc<dyn ChainClient>,
    config: RegistryConfig,
    state: Mutex<CacheState>,
}

impl RegistryCache {
    pub fn new(client: Arc<dyn ChainClient>, config: RegistryConfig) -> Self {
        Self {
            client,
            config,
            state: Mutex::new(CacheState {
                snapshot: None,
                fetched_at: Instant::now(),
                refresh_in_progress: false,
            }),
        }
    }

    /// The cached snapshot, refreshing first when it is missing or stale
    /// for `epoch_id`. Concurrent callers during a refresh get the prior
    /// snapshot instead of blocking.
    pub async fn get_metagraph(&self, epoch_id: u64) -> Result<Arc<MetagraphSnapshot>, RegistryError> {
        enum Plan {
            Serve(Arc<MetagraphSnapshot>),
            Fetch,
            /// A refresh is already in flight and nothing is cached yet.
            Unavailable,
        }

        let plan = {
            let mut state = self.state.lock();
            let fresh = state.snapshot.as_ref().is_some_and(|snap| {
                snap.epoch_id == epoch_id && state.fetched_at.elapsed() < self.config.max_age
            });
            if fresh {
                // is_some_and above guarantees the snapshot exists.
                Plan::Serve(state.snapshot.clone().ok_or(RegistryError::NoSnapshot)?)
            } else if state.refresh_in_progress {
                match state.snapshot.clone() {
                    Some(stale) => Plan::Serve(stale),
                    None => Plan::Unavailable,
                }
            } else {
                state.refresh_in_progress = true;
                Plan::Fetch
            }
        };

        match plan {
            Plan::Serve(snap) => Ok(snap),
            Plan::Unavailable => Err(RegistryError::NoSnapshot),
            Plan::Fetch => self.refresh(epoch_id).await,
        }
    }

    /// Classify a hotkey against the current epoch's snapshot.
    pub async fn classify(&self, epoch_id: u64, hotkey: &str) -> Result<Classification, RegistryError> {
        let snapshot = self.get_metagraph(epoch_id).await?;
        Ok(Classification::of(&snapshot, hotkey))
    }

    /// Background warm-up for a new epoch, triggered by the block monitor
    /// at every epoch transition.
    pub async fn warm(&self, epoch_id: u64) {
        match self.get_metagraph(epoch_id).await {
            Ok(snap) => info!(
                epoch_id,
                neurons = snap.neurons.len(),
                "metagraph cache warmed"
            ),
            Err(e) => warn!(epoch_id, error = %e, "metagraph warm-up failed"),
        }
    }

    /// Run the fetch ladder outside the lock, then publish.
    ///
    /// Caller must hold the `refresh_in_progress` claim.
    async fn refresh(&self, epoch_id: u64) -> Result<Arc<MetagraphSnapshot>, RegistryError> {
        let fetched = self.fetch_with_retries().await;

        let mut state = self.state.lock();
        state.refresh_in_progress = false;

        match fetched {
            Ok(neurons) => {
                let snapshot = Arc::new(MetagraphSnapshot {
                    epoch_id,
                    netuid: self.config.netuid,
                    neurons,
                });
                state.snapshot = Some(snapshot.clone());
                state.fetched_at = Instant::now();
                info!(
                    epoch_id,
                    neurons = snapshot.neurons.len(),
                    "metagraph snapshot published"
                );
                Ok(snapshot)
            }
            Err(e) => {
                // Bump the age so the next reader does not immediately
                // re-run the whole ladder.
                state.fetched_at = Instant::now();
                match state.snapshot.clone() {
                    Some(stale) => {
                        warn!(
                            epoch_id,
                            stale_epoch = stale.epoch_id,
                            error = %e,
                            "metagraph refresh failed, serving stale fallback"
                        );
                        Ok(stale)
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn fetch_with_retries(&self) -> Result<Vec<shared_types::Neuron>, RegistryError> {
        let mut last = ChainError::Rpc("no attempts made".to_string());
        for attempt in 1..=METAGRAPH_FETCH_ATTEMPTS {
            let fetch = async {
                // First half of the ladder uses the long-lived client;
                // second half opens fresh connections.
                if attempt <= METAGRAPH_FETCH_ATTEMPTS / 2 {
                    self.client.get_metagraph(self.config.netuid).await
                } else {
                    self.client.get_metagraph_fresh(self.config.netuid).await
                }
            };
            let result =
                tokio::time::timeout(Duration::from_secs(CHAIN_RPC_TIMEOUT_SECS), fetch).await;

            match result {
                Ok(Ok(neurons)) => return Ok(neurons),
                Ok(Err(e)) => last = e,
                Err(_) => last = ChainError::Timeout(CHAIN_RPC_TIMEOUT_SECS),
            }
            warn!(attempt, error = %last, "metagraph fetch attempt failed");

            if attempt < METAGRAPH_FETCH_ATTEMPTS {
                let backoff =
                    Duration::from_secs(1 << attempt.min(10)).min(self.config.backoff_cap);
                tokio::time::sleep(backoff).await;
            }
        }
        Err(RegistryError::FetchExhausted {
            attempts: METAGRAPH_FETCH_ATTEMPTS,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lg_01_chain_client::SimChainClient;
    use shared_types::Neuron;

    fn neuron(hotkey: &str, validator: bool) -> Neuron {
        Neuron {
            hotkey: hotkey.to_string(),
            uid: 0,
            stake: 1_000.0,
            validator_trust: 0.8,
            active: true,
            validator_permit: validator,
        }
    }

    fn cache_with(sim: Arc<SimChainClient>) -> RegistryCache {
        let mut config = RegistryConfig::new(401);
        config.backoff_cap = Duration::from_millis(1);
        RegistryCache::new(sim, config)
    }

    #[tokio::test]
    async fn test_fetch_and_classify() {
        let sim = Arc::new(SimChainClient::new(0));
        sim.set_neurons(vec![neuron("5V", true), neuron("5M", false)]);
        let cache = cache_with(sim);

        let snap = cache.get_metagraph(3).await.unwrap();
        assert_eq!(snap.epoch_id, 3);
        assert!(cache.classify(3, "5V").await.unwrap().is_validator());
        assert!(cache.classify(3, "5M").await.unwrap().is_miner());
        assert_eq!(
            cache.classify(3, "5X").await.unwrap(),
            Classification::Absent
        );
    }

    #[tokio::test]
    async fn test_epoch_advance_invalidates() {
        let sim = Arc::new(SimChainClient::new(0));
        sim.set_neurons(vec![neuron("5V", true)]);
        let cache = cache_with(sim.clone());

        let first = cache.get_metagraph(1).await.unwrap();
        sim.set_neurons(vec![neuron("5V", true), neuron("5W", true)]);
        let second = cache.get_metagraph(2).await.unwrap();

        assert_eq!(first.neurons.len(), 1);
        assert_eq!(second.neurons.len(), 2);
        assert_eq!(second.epoch_id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fallback_on_outage() {
        let sim = Arc::new(SimChainClient::new(0));
        sim.set_neurons(vec![neuron("5V", true)]);
        let cache = cache_with(sim.clone());

        let snap = cache.get_metagraph(1).await.unwrap();
        assert_eq!(snap.epoch_id, 1);

        // Chain goes down; a refresh for epoch 2 serves the stale epoch-1
        // snapshot instead of failing.
        sim.set_failing(true);
        let fallback = cache.get_metagraph(2).await.unwrap();
        assert_eq!(fallback.epoch_id, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_outage_errors() {
        let sim = Arc::new(SimChainClient::new(0));
        sim.set_failing(true);
        let cache = cache_with(sim);
        assert!(matches!(
            cache.get_metagraph(1).await,
            Err(RegistryError::FetchExhausted { .. })
        ));
    }
}
