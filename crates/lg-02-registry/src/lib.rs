//! # LG-02 Registry Cache
//!
//! Fast, epoch-consistent reads of the on-chain neuron set.
//!
//! ## Refresh protocol
//!
//! A single snapshot is cached at a time, keyed by `epoch_id`. Under a
//! brief lock a caller either claims the right to refresh (an
//! `in_progress` flag) or takes the cached snapshot; the network fetch
//! runs OUTSIDE the lock and re-acquires it only to publish. Readers are
//! never blocked behind a fetch.
//!
//! ## Fetch strategy
//!
//! 8 attempts, each bounded to 60 s. Attempts 1-4 use the long-lived
//! client; attempts 5-8 use a fresh connection, which tolerates
//! long-lived-session staleness. Exponential backoff (capped) between
//! attempts. On exhaustion the previous snapshot keeps serving, loudly
//! marked as a stale fallback, and the cache age is bumped so retries are
//! throttled instead of hammering the chain.

pub mod cache;
pub mod classify;
pub mod errors;

pub use cache::{RegistryCache, RegistryConfig};
pub use classify::Classification;
pub use errors::RegistryError;
