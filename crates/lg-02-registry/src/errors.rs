//! Registry error types.

use lg_01_chain_client::ChainError;
use thiserror::Error;

/// Errors surfaced by the registry cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("metagraph fetch failed after {attempts} attempts: {last}")]
    FetchExhausted { attempts: u32, last: ChainError },

    #[error("no metagraph snapshot available yet")]
    NoSnapshot,
}
