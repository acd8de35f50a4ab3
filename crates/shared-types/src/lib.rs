//! # Shared Domain Types
//!
//! Core entities and the transparency-event envelope shared by every
//! Leadgate subsystem.
//!
//! ## Clusters
//!
//! - **Leads**: `Lead`, `LeadStatus`, `ConsensusSnapshot`
//! - **Epochs**: `EpochAssignment`, epoch/block constants
//! - **Evidence**: `ValidationEvidence`, `Decision`, `ValidatorManifest`
//! - **Registry**: `Neuron`, `MetagraphSnapshot`, `Role`
//! - **Transparency**: `EventType`, `EventPayload`, `SignedEvent`, `LogEntry`
//! - **Rate limiting**: `SubmissionCounters`

pub mod checkpoints;
pub mod constants;
pub mod counters;
pub mod entities;
pub mod events;

pub use checkpoints::*;
pub use constants::*;
pub use counters::{RateLimitConfig, RateLimitError, SubmissionCounters};
pub use entities::*;
pub use events::*;
