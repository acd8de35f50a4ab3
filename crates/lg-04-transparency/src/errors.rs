//! Transparency log error types.

use lg_03_store::StoreError;
use thiserror::Error;

/// Errors from the enclave boundary and the log writer.
#[derive(Debug, Error)]
pub enum TeeError {
    #[error("enclave RPC timed out after {0}s")]
    RpcTimeout(u64),

    #[error("enclave rejected the request: {0}")]
    Rejected(String),

    #[error("log store append failed: {0}")]
    Store(#[from] StoreError),

    #[error("durable fallback write failed: {0}")]
    FallbackWrite(String),
}

/// Errors from permanent-storage uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Request(String),

    #[error("storage returned status {0}")]
    Status(u16),

    #[error("upload unconfirmed after {0}s")]
    Unconfirmed(u64),

    #[error("malformed storage response: {0}")]
    MalformedResponse(String),
}
