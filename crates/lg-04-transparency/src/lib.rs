//! # LG-04 Transparency Log
//!
//! Every state-changing event in the gateway is signed by the enclave
//! key, linked into a hash chain, buffered, and periodically anchored to
//! permanent public storage via Merkle checkpoints.
//!
//! ## Layers
//!
//! - `signer`: the in-enclave state (boot id, monotonic sequence, chain
//!   tip, event buffer) and the append critical section
//! - `service`: the narrow RPC surface the host sees (`TeeService`), with
//!   the in-process adapter used outside Nitro deployments
//! - `log`: the host-side writer combining the enclave with the
//!   persistent log store and the durable file fallback
//! - `attestation`: code-hash computation and the attestation document
//! - `arweave`: the permanent-storage port, HTTP client, and gzip
//!   compression for checkpoint batches
//!
//! ## Single-process requirement
//!
//! The hash chain is one serialized sequence. Multiple gateway workers
//! would fork it; the host binary fails fast at startup when a
//! multi-worker setting is detected.

pub mod arweave;
pub mod attestation;
pub mod errors;
pub mod log;
pub mod service;
pub mod signer;

pub use arweave::{ArweaveClient, MockPermanentStore, PermanentStore};
pub use attestation::{compute_code_hash, AttestationDocument};
pub use errors::{TeeError, UploadError};
pub use log::TransparencyLog;
pub use service::{LocalTeeService, TeeService};
pub use signer::EnclaveSigner;

/// Enclave RPC timeout in seconds.
pub const ENCLAVE_RPC_TIMEOUT_SECS: u64 = 30;
