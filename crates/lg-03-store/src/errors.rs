//! Store error types.

use shared_types::{LeadStatus, RateLimitError};
use thiserror::Error;

/// Errors surfaced by the row-store ports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("duplicate lead fingerprint ({0})")]
    DuplicateFingerprint(String),

    #[error("commit already exists for this (validator, lead, epoch)")]
    DuplicateCommit,

    #[error("epoch {0} already has an EPOCH_INITIALIZATION event")]
    DuplicateEpochInitialization(u64),

    #[error("nonce already used")]
    NonceReplayed,

    #[error("manifest already submitted for this (validator, epoch)")]
    DuplicateManifest,

    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition { from: LeadStatus, to: LeadStatus },

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error("store query timed out after {0}s")]
    Timeout(u64),

    #[error("store backend error: {0}")]
    Backend(String),
}
