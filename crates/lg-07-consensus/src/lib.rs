//! # LG-07 Consensus Aggregator
//!
//! Combines revealed validator decisions into one outcome per
//! `(lead, epoch)` using `v_trust × stake` weights.
//!
//! - `aggregate`: the pure weighted math (decision, rep score, primary
//!   rejection reason, ICP multiplier)
//! - `service`: the transactional apply (per-lead lease, retry with
//!   backoff, rejection accounting, and the public `CONSENSUS_RESULT`
//!   event)
//!
//! The block-330 batch pass is canonical; eager per-reveal updates give
//! incremental visibility and are overwritten harmlessly because the
//! apply is idempotent.

pub mod aggregate;
pub mod errors;
pub mod service;

pub use aggregate::{aggregate, ConsensusAggregate};
pub use errors::ConsensusError;
pub use service::{ConsensusConfig, ConsensusService, LeadOutcome};
