//! Chain client error types.

use thiserror::Error;

/// Errors surfaced by the chain interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain RPC timed out after {0}s")]
    Timeout(u64),

    #[error("chain RPC failed: {0}")]
    Rpc(String),

    #[error("no current block available and no cached block to estimate from")]
    NoCachedBlock,
}
