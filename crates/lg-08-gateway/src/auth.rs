//! # Signed-Request Authentication
//!
//! Every privileged call carries two headers:
//!
//! - `x-hotkey`: the caller's SS58 address
//! - `x-signature`: hex Ed25519 signature over the canonical message
//!
//! The canonical message is endpoint-specific: a literal string for GET
//! lead fetches, the canonical JSON of the body for POSTs. After the
//! signature verifies, the hotkey is classified against the registry
//! and the endpoint's role requirement is enforced.
//!
//! Authentication failures are client errors and are never logged as
//! transparency events (they would pollute the chain).

use axum::http::HeaderMap;
use lg_02_registry::Classification;
use shared_crypto::{canonical_json_bytes, verify_ss58_signature};
use shared_types::Role;

use crate::error::ApiError;
use crate::state::AppState;

/// Hotkey header name.
pub const HOTKEY_HEADER: &str = "x-hotkey";
/// Signature header name.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller {
    pub hotkey: String,
    pub role: Role,
}

/// Extract the hotkey and signature headers.
pub fn signed_headers(headers: &HeaderMap) -> Result<(String, String), ApiError> {
    let hotkey = headers
        .get(HOTKEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::auth("missing x-hotkey header"))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::auth("missing x-signature header"))?;
    Ok((hotkey.to_string(), signature.to_string()))
}

/// Verify a signature over an explicit message and resolve the caller's
/// role for `epoch_id`.
pub async fn authenticate_message(
    state: &AppState,
    headers: &HeaderMap,
    message: &[u8],
    epoch_id: u64,
    required_role: Role,
) -> Result<Caller, ApiError> {
    let (hotkey, signature) = signed_headers(headers)?;

    verify_ss58_signature(message, &signature, &hotkey)
        .map_err(|_| ApiError::auth("signature verification failed"))?;

    let classification = state.registry.classify(epoch_id, &hotkey).await?;
    let role = match classification {
        Classification::Registered(role) => role,
        Classification::Absent => {
            return Err(ApiError::auth("hotkey not registered on the metagraph"))
        }
    };
    if role != required_role {
        return Err(ApiError::auth(match required_role {
            Role::Validator => "endpoint requires a validator hotkey",
            Role::Miner => "endpoint requires a miner hotkey",
        }));
    }

    Ok(Caller { hotkey, role })
}

/// Verify a signature over the canonical JSON of a request body.
pub async fn authenticate_body(
    state: &AppState,
    headers: &HeaderMap,
    body: &serde_json::Value,
    epoch_id: u64,
    required_role: Role,
) -> Result<Caller, ApiError> {
    let message = canonical_json_bytes(body);
    authenticate_message(state, headers, &message, epoch_id, required_role).await
}

/// The canonical message for epoch lead fetches.
pub fn epoch_leads_message(epoch_id: u64, hotkey: &str) -> String {
    format!("GET_EPOCH_LEADS:{}:{}", epoch_id, hotkey)
}
