//! # Hotkey Classification
//!
//! Resolves a hotkey against a metagraph snapshot into the role the
//! endpoints enforce.

use shared_types::{MetagraphSnapshot, Role};

/// Result of classifying a hotkey against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Registered with a resolved role.
    Registered(Role),
    /// Hotkey absent from the metagraph.
    Absent,
}

impl Classification {
    /// Classify a hotkey against a snapshot.
    pub fn of(snapshot: &MetagraphSnapshot, hotkey: &str) -> Self {
        match snapshot.neuron(hotkey) {
            Some(neuron) => Classification::Registered(neuron.role()),
            None => Classification::Absent,
        }
    }

    pub fn is_validator(self) -> bool {
        matches!(self, Classification::Registered(Role::Validator))
    }

    pub fn is_miner(self) -> bool {
        matches!(self, Classification::Registered(Role::Miner))
    }
}
