//! # LG-09 Background Tasks
//!
//! The gateway's long-lived workers, each a cooperative loop on the
//! runtime with an explicit restart-on-error policy:
//!
//! - `epoch_monitor`: polls the chain every 12 s and drives the epoch
//!   state machine
//! - `checkpoints`: batches buffered events into signed Merkle
//!   checkpoints and anchors them to permanent storage
//! - `anchor`: daily `ANCHOR_ROOT` emission for out-of-band tamper
//!   detection
//! - `sweep`: removes leads of deregistered miners
//! - `warmer`: refreshes the metagraph cache across epoch transitions
//!
//! No worker failure is fatal: errors are logged and the worker
//! relaunches after a delay.

pub mod anchor;
pub mod checkpoints;
pub mod epoch_monitor;
pub mod supervisor;
pub mod sweep;
pub mod warmer;

pub use anchor::AnchorTask;
pub use checkpoints::CheckpointBatcher;
pub use epoch_monitor::EpochMonitor;
pub use supervisor::spawn_supervised;
pub use sweep::DeregisteredSweep;
pub use warmer::MetagraphWarmer;
