//! Gateway middleware stack.
//!
//! Order matters: rate limiting runs first (cheap rejection), then the
//! priority gate, then the handlers.

pub mod priority;
pub mod rate_limit;

pub use priority::PriorityLayer;
pub use rate_limit::{RateLimitConfig, RateLimitLayer};
