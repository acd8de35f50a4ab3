//! # LG-01 Chain Client
//!
//! The gateway's interface to the chain: a polled block number stream and
//! the metagraph of registered neurons.
//!
//! The chain is an external collaborator, so this crate only defines the
//! ports plus the resilience layer around them:
//!
//! - `ChainClient`: the narrow RPC surface (current block, metagraph)
//! - `BlockCache`: time-based block estimation when the RPC is down
//! - `BlockPoller`: the combination used by every caller
//! - `SimChainClient`: in-memory adapter for tests and local runs
//!
//! Block numbers are POLLED, never subscribed: long-lived subscriptions
//! reconnect badly across network blips, while a 12-second poll matches
//! the chain's block cadence exactly.

pub mod adapters;
pub mod block_cache;
pub mod errors;
pub mod poller;
pub mod ports;

pub use adapters::sim::SimChainClient;
pub use block_cache::BlockCache;
pub use errors::ChainError;
pub use poller::BlockPoller;
pub use ports::ChainClient;

/// Per-attempt timeout for chain RPCs.
pub const CHAIN_RPC_TIMEOUT_SECS: u64 = 60;

/// Total fetch attempts before a metagraph refresh gives up.
pub const METAGRAPH_FETCH_ATTEMPTS: u32 = 8;
