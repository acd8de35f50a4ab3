//! # LG-03 Row Store
//!
//! Ports for the gateway's persistent tables. The backing store is an
//! external collaborator (a relational store with row-level security in
//! production), so the tables are specified here as typed traits and the
//! invariants they must enforce:
//!
//! - `leads_private`: fingerprint uniqueness across non-removed leads,
//!   monotonic status transitions
//! - `validation_evidence_private`: one row per
//!   `(validator, lead, epoch)`, append-only until reveal
//! - `transparency_log`: append-only, nonce uniqueness, exactly one
//!   `EPOCH_INITIALIZATION` per epoch
//! - `merkle_checkpoints`: checkpoint headers and tree levels
//! - submission counters and validator manifests
//!
//! The in-memory adapter lives here and backs the test suite; the
//! RocksDB adapter lives in `node-runtime` next to the binary that owns
//! the data directory.

pub mod adapters;
pub mod errors;
pub mod ports;

pub use adapters::memory::MemoryStore;
pub use errors::StoreError;
pub use ports::{
    CheckpointStore, CounterStore, EvidenceStore, GatewayStore, LeadStore, ManifestStore,
    TransparencyLogStore,
};
