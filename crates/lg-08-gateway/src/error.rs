//! # API Error Taxonomy
//!
//! Client-facing errors carry an enumerated code and a short reason.
//! Stack traces and internal identifiers never leak; upstream failures
//! collapse to `upstream_timeout`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lg_01_chain_client::ChainError;
use lg_02_registry::RegistryError;
use lg_03_store::StoreError;
use lg_06_commit_reveal::CommitRevealError;
use lg_07_consensus::ConsensusError;
use serde::{Deserialize, Serialize};

/// Enumerated error kinds, one per taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Bad signature, unregistered hotkey, role mismatch.
    AuthFailed,
    /// Wrong phase or window.
    TemporalViolation,
    /// Hash mismatch, duplicate, malformed pairing.
    DataViolation,
    /// Unknown evidence or resource.
    NotFound,
    /// Per-miner or per-IP limits.
    RateLimited,
    /// Upstream (chain, store, enclave) exhausted its retries.
    UpstreamTimeout,
    /// Anything the gateway cannot attribute.
    Internal,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::AuthFailed => StatusCode::FORBIDDEN,
            ErrorCode::TemporalViolation | ErrorCode::DataViolation => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The error payload every failing endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorCode,
    pub reason: String,
}

impl ApiError {
    pub fn new(error: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            error,
            reason: reason.into(),
        }
    }

    pub fn auth(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthFailed, reason)
    }

    pub fn temporal(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::TemporalViolation, reason)
    }

    pub fn data(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataViolation, reason)
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, reason)
    }

    pub fn rate_limited(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, reason)
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamTimeout, reason)
    }

    pub fn internal() -> Self {
        Self::new(ErrorCode::Internal, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.error.status(), Json(self)).into_response()
    }
}

impl From<CommitRevealError> for ApiError {
    fn from(e: CommitRevealError) -> Self {
        use CommitRevealError as E;
        match &e {
            E::RateLimited(_) => ApiError::rate_limited(e.to_string()),
            E::MissingEmail
            | E::DuplicateLead(_)
            | E::DuplicateCommit
            | E::HashMismatch(_)
            | E::RepScoreOutOfRange(_)
            | E::BadReasonPairing
            | E::ConflictingReveal
            | E::ManifestMismatch => ApiError::data(e.to_string()),
            E::OutsideCommitWindow { .. } | E::RevealWindowClosed(_) | E::NotAssigned(_) => {
                ApiError::temporal(e.to_string())
            }
            E::UnknownEvidence => ApiError::not_found(e.to_string()),
            E::NotEvidenceOwner => ApiError::auth(e.to_string()),
            E::Store(StoreError::Timeout(_)) | E::Log(_) | E::Epoch(_) => {
                ApiError::upstream("upstream dependency failed")
            }
            E::Store(StoreError::DuplicateManifest) => ApiError::data(e.to_string()),
            E::Store(_) => ApiError::internal(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(_: RegistryError) -> Self {
        ApiError::upstream("metagraph unavailable")
    }
}

impl From<ChainError> for ApiError {
    fn from(_: ChainError) -> Self {
        ApiError::upstream("chain unavailable")
    }
}

impl From<ConsensusError> for ApiError {
    fn from(_: ConsensusError) -> Self {
        ApiError::upstream("consensus update failed")
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout(_) => ApiError::upstream("store timed out"),
            StoreError::NotFound => ApiError::not_found("row not found"),
            StoreError::RateLimited(inner) => ApiError::rate_limited(inner.to_string()),
            other => ApiError::data(other.to_string()),
        }
    }
}
