//! # Router
//!
//! Route table and middleware stack. The layer order is outermost-first:
//! rate limiting, then the priority gate, then the handlers.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::handlers::{attestation, epoch, manifest, reveal, submit, validate};
use crate::middleware::{PriorityLayer, RateLimitConfig, RateLimitLayer};
use crate::state::AppState;

/// Build the gateway router with the full middleware stack.
pub fn build_router(state: AppState) -> Router {
    build_router_with(state, RateLimitConfig::default(), PriorityLayer::default())
}

/// Router with explicit middleware configuration (used by tests).
pub fn build_router_with(
    state: AppState,
    rate_limits: RateLimitConfig,
    priority: PriorityLayer,
) -> Router {
    Router::new()
        // Miner ingress
        .route("/submit", post(submit::post_submit))
        // Validator protocol
        .route("/epoch/:id/leads", get(epoch::get_leads))
        .route("/validate", post(validate::post_validate))
        .route("/reveal", post(reveal::post_reveal))
        .route("/manifest", post(manifest::post_manifest))
        // Public epoch metadata
        .route("/epoch/current", get(epoch::get_current))
        .route("/epoch/:id/info", get(epoch::get_info))
        // Public attestation
        .route("/attestation/document", get(attestation::get_document))
        .route("/attestation/pubkey", get(attestation::get_pubkey))
        .route("/attestation/health", get(attestation::get_health))
        // Public operational metrics
        .route("/reveal/stats", get(reveal::get_reveal_stats))
        .route("/manifest/stats", get(manifest::get_manifest_stats))
        .route(
            "/manifest/validator/:hotkey",
            get(manifest::get_manifest_for_validator),
        )
        .layer(priority)
        .layer(RateLimitLayer::new(rate_limits))
        // Public read endpoints are consumed by browser-based auditors.
        .layer(CorsLayer::permissive())
        .with_state(state)
}
