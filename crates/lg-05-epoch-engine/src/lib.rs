//! # LG-05 Epoch Engine
//!
//! Deterministic, block-driven epoch lifecycle:
//!
//! - `math`: epoch arithmetic and phase-window predicates
//! - `tracker`: the per-block state machine with bounded dedup sets;
//!   decides WHICH transitions to attempt, never performs them
//! - `assignment`: FIFO lead selection and the queue Merkle root
//! - `cache`: the two-epoch prefetch cache
//! - `lifecycle`: the transitions themselves (initialize, end, fallback
//!   materialization), each atomic at the log-event level
//!
//! Missed polls are harmless: every transition is guarded by the tracker
//! sets and re-runs idempotently on the next block.

pub mod assignment;
pub mod cache;
pub mod errors;
pub mod lifecycle;
pub mod math;
pub mod tracker;

pub use cache::LeadCache;
pub use errors::EpochError;
pub use lifecycle::EpochLifecycle;
pub use math::{block_within_epoch, epoch_id_for_block, epoch_start_block, RevealWindow};
pub use tracker::{EpochAction, EpochTracker};
