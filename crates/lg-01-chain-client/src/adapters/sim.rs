//! # Simulated Chain
//!
//! In-memory `ChainClient` with settable block height, metagraph, and
//! failure injection. Drives the integration suite and local runs without
//! a chain endpoint.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::Neuron;

use crate::errors::ChainError;
use crate::ports::ChainClient;

/// Settable in-memory chain.
#[derive(Default)]
pub struct SimChainClient {
    block: AtomicU64,
    neurons: RwLock<Vec<Neuron>>,
    failing: AtomicBool,
}

impl SimChainClient {
    pub fn new(block: u64) -> Self {
        Self {
            block: AtomicU64::new(block),
            neurons: RwLock::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Set the current block height.
    pub fn set_block(&self, height: u64) {
        self.block.store(height, Ordering::SeqCst);
    }

    /// Advance the chain by `n` blocks.
    pub fn advance(&self, n: u64) -> u64 {
        self.block.fetch_add(n, Ordering::SeqCst) + n
    }

    /// Replace the registered neuron set.
    pub fn set_neurons(&self, neurons: Vec<Neuron>) {
        *self.neurons.write() = neurons;
    }

    /// Toggle failure injection for every RPC.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), ChainError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ChainError::Rpc("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChainClient for SimChainClient {
    async fn get_current_block(&self) -> Result<u64, ChainError> {
        self.check_failing()?;
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn get_metagraph(&self, _netuid: u16) -> Result<Vec<Neuron>, ChainError> {
        self.check_failing()?;
        Ok(self.neurons.read().clone())
    }

    async fn get_metagraph_fresh(&self, netuid: u16) -> Result<Vec<Neuron>, ChainError> {
        // The simulator has no connection to go stale.
        self.get_metagraph(netuid).await
    }
}
