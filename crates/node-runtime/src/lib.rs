//! # Leadgate Node Runtime
//!
//! Startup wiring for the gateway binary: environment configuration,
//! fail-fast checks, the persistent RocksDB store adapter, and the
//! application context that every subsystem borrows.

pub mod adapters;
pub mod config;
pub mod context;

pub use adapters::storage::rocksdb_adapter::{RocksDbConfig, RocksStore};
pub use config::NodeConfig;
pub use context::AppContext;
