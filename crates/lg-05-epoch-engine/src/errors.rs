//! Epoch engine error types.

use lg_02_registry::RegistryError;
use lg_03_store::StoreError;
use lg_04_transparency::TeeError;
use thiserror::Error;

/// Errors from epoch lifecycle transitions.
#[derive(Debug, Error)]
pub enum EpochError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("transparency log error: {0}")]
    Log(#[from] TeeError),

    #[error("epoch {0} has no initialization event")]
    NotInitialized(u64),

    #[error("cached assignment epoch mismatch: wanted {wanted}, found {found}")]
    CacheEpochMismatch { wanted: u64, found: u64 },
}
