//! # Lead Prefetch Cache
//!
//! Holds at most two epochs of assignment data (current + next). The
//! prefetch task fills the next epoch's entry during blocks [351, 360)
//! so the first validator request of a new epoch is served warm.
//!
//! Readers must name the epoch they want; entries are validated against
//! the requested id, which shields callers from key-value corruption.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use shared_types::{EpochAssignment, Lead};

use crate::errors::EpochError;

/// One cached epoch: the assignment plus the full lead rows validators
/// download.
#[derive(Debug, Clone)]
pub struct CachedEpoch {
    pub assignment: EpochAssignment,
    pub leads: Vec<Lead>,
}

/// Two-epoch assignment cache.
#[derive(Debug, Default)]
pub struct LeadCache {
    entries: Mutex<BTreeMap<u64, CachedEpoch>>,
}

impl LeadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an epoch's data, evicting everything but the newest two
    /// epochs.
    pub fn insert(&self, entry: CachedEpoch) {
        let mut entries = self.entries.lock();
        entries.insert(entry.assignment.epoch_id, entry);
        while entries.len() > 2 {
            if let Some(oldest) = entries.keys().next().copied() {
                entries.remove(&oldest);
            }
        }
    }

    /// Fetch an epoch's entry, verifying the stored id matches.
    pub fn get(&self, epoch_id: u64) -> Result<Option<CachedEpoch>, EpochError> {
        let entries = self.entries.lock();
        match entries.get(&epoch_id) {
            None => Ok(None),
            Some(entry) if entry.assignment.epoch_id == epoch_id => Ok(Some(entry.clone())),
            Some(entry) => Err(EpochError::CacheEpochMismatch {
                wanted: epoch_id,
                found: entry.assignment.epoch_id,
            }),
        }
    }

    /// Whether an epoch is already cached.
    pub fn contains(&self, epoch_id: u64) -> bool {
        self.entries.lock().contains_key(&epoch_id)
    }

    /// Drop an epoch's entry.
    pub fn remove(&self, epoch_id: u64) {
        self.entries.lock().remove(&epoch_id);
    }
}
