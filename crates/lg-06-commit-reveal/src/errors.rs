//! Commit-reveal error types, aligned with the gateway error taxonomy:
//! temporal violations and data violations surface as client errors with
//! no state change; transient upstream failures keep their source error.

use lg_03_store::StoreError;
use lg_04_transparency::TeeError;
use lg_05_epoch_engine::EpochError;
use shared_types::RateLimitError;
use thiserror::Error;

/// Errors from the commit-reveal services.
#[derive(Debug, Error)]
pub enum CommitRevealError {
    // --- Rate limiting (429) ---
    #[error("rate limited: {0}")]
    RateLimited(RateLimitError),

    // --- Data violations (400) ---
    #[error("lead blob is missing a valid email")]
    MissingEmail,

    #[error("duplicate lead: {0} already present")]
    DuplicateLead(String),

    #[error("duplicate commit for this (validator, lead, epoch)")]
    DuplicateCommit,

    #[error("revealed {0} does not match its commitment hash")]
    HashMismatch(&'static str),

    #[error("rep_score {0} outside [0, 48]")]
    RepScoreOutOfRange(u32),

    #[error("rejection_reason must be \"pass\" iff decision is approve")]
    BadReasonPairing,

    #[error("re-reveal with different values rejected")]
    ConflictingReveal,

    #[error("manifest root does not match stored evidence")]
    ManifestMismatch,

    // --- Temporal violations (400) ---
    #[error("epoch {epoch_id} is not accepting commits at block {block}")]
    OutsideCommitWindow { epoch_id: u64, block: u64 },

    #[error("reveal window violation: {0}")]
    RevealWindowClosed(String),

    #[error("lead is not part of epoch {0}'s assignment")]
    NotAssigned(u64),

    // --- Ownership (403/404) ---
    #[error("evidence not found")]
    UnknownEvidence,

    #[error("evidence belongs to another validator")]
    NotEvidenceOwner,

    // --- Upstream ---
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("transparency log error: {0}")]
    Log(#[from] TeeError),

    #[error("epoch engine error: {0}")]
    Epoch(#[from] EpochError),
}

impl From<StoreError> for CommitRevealError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::RateLimited(inner) => CommitRevealError::RateLimited(inner),
            StoreError::DuplicateFingerprint(field) => CommitRevealError::DuplicateLead(field),
            StoreError::DuplicateCommit => CommitRevealError::DuplicateCommit,
            other => CommitRevealError::Store(other),
        }
    }
}
