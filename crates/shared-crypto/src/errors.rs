//! Crypto error types.

use thiserror::Error;

/// Errors from the cryptographic primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid SS58 address: {0}")]
    InvalidSs58Address(String),

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("merkle tree requires at least one leaf")]
    EmptyMerkleTree,

    #[error("leaf index {index} out of range (0..{len})")]
    LeafIndexOutOfRange { index: usize, len: usize },
}
