//! Consensus error types.

use lg_02_registry::RegistryError;
use lg_03_store::StoreError;
use lg_04_transparency::TeeError;
use thiserror::Error;

/// Errors from consensus computation and apply.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("transparency log error: {0}")]
    Log(#[from] TeeError),

    #[error("lead {0} not found")]
    LeadNotFound(uuid::Uuid),

    #[error("malformed initialization event for epoch {0}")]
    BadAssignment(u64),

    #[error("consensus apply failed after {0} attempts")]
    RetriesExhausted(u32),
}
