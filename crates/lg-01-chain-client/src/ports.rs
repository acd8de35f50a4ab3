//! # Chain Ports (Driven)
//!
//! The interfaces the host must provide to talk to the chain. Production
//! wires a substrate RPC implementation at deployment; tests and local
//! runs use `SimChainClient`.

use async_trait::async_trait;
use shared_types::Neuron;

use crate::errors::ChainError;

/// Narrow RPC surface of the chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain block height.
    async fn get_current_block(&self) -> Result<u64, ChainError>;

    /// Registered neurons of a subnet, via the long-lived connection.
    async fn get_metagraph(&self, netuid: u16) -> Result<Vec<Neuron>, ChainError>;

    /// Registered neurons of a subnet, via a fresh connection.
    ///
    /// Long-lived connections go stale without erroring; implementations
    /// open a new session per call (run on the blocking pool) so the
    /// later refresh attempts are immune to that failure mode.
    async fn get_metagraph_fresh(&self, netuid: u16) -> Result<Vec<Neuron>, ChainError>;
}
