//! # LG-08 HTTP Gateway
//!
//! The public surface of the coordination gateway.
//!
//! ## Request pipeline
//!
//! ```text
//! request ──► RateLimit (per-IP) ──► Priority (validators bypass,
//!            miners bounded) ──► handler ──► signature auth ──► role
//!            gate ──► protocol service
//! ```
//!
//! Every privileged call carries an SS58 hotkey and a detached Ed25519
//! signature over a canonical message: the literal
//! `"GET_EPOCH_LEADS:<id>:<hotkey>"` for lead fetches, the canonical
//! JSON of the body for POSTs. Public endpoints (epoch metadata,
//! attestation, stats) skip auth entirely.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ErrorCode};
pub use router::build_router;
pub use state::AppState;
