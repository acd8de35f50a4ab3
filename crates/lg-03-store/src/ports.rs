//! # Store Ports (Driven)
//!
//! Typed table APIs the gateway requires from its backing store.
//! Implementations enforce the table invariants; callers never see raw
//! rows or keys.

use async_trait::async_trait;
use shared_types::{
    CheckpointRecord, ConsensusSnapshot, EventType, Lead, LeadStatus, LogEntry, RateLimitConfig,
    SubmissionCounters, ValidationEvidence, ValidatorManifest,
};
use uuid::Uuid;

use crate::errors::StoreError;

/// `leads_private` table.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert a new lead in `pending_validation`.
    ///
    /// # Errors
    /// - `DuplicateFingerprint` if `email_hash` or `linkedin_combo_hash`
    ///   collides with any non-removed lead
    async fn insert_lead(&self, lead: Lead) -> Result<(), StoreError>;

    async fn get_lead(&self, lead_id: &Uuid) -> Result<Option<Lead>, StoreError>;

    /// Fetch leads by id, preserving the requested order. Missing ids are
    /// skipped.
    async fn leads_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, StoreError>;

    /// Oldest `pending_validation` leads by submission timestamp.
    async fn oldest_pending(&self, limit: usize) -> Result<Vec<Lead>, StoreError>;

    async fn pending_count(&self) -> Result<usize, StoreError>;

    /// Promote a batch of leads to `validating` (epoch snapshot taken).
    async fn mark_validating(&self, ids: &[Uuid]) -> Result<(), StoreError>;

    /// Apply a consensus outcome: status, snapshot, and ICP multiplier in
    /// one write. Passing `snapshot = None` clears stale consensus fields
    /// (the zero-reveal path).
    async fn apply_consensus(
        &self,
        lead_id: &Uuid,
        status: LeadStatus,
        snapshot: Option<ConsensusSnapshot>,
        icp_multiplier: Option<f64>,
    ) -> Result<(), StoreError>;

    /// Whether either fingerprint collides with a non-removed lead.
    async fn fingerprint_exists(
        &self,
        email_hash: &str,
        linkedin_combo_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Leads in non-final statuses, for the deregistered-miner sweep.
    async fn nonfinal_leads(&self) -> Result<Vec<Lead>, StoreError>;

    /// Delete a lead row. Returns whether a row was removed.
    async fn delete_lead(&self, lead_id: &Uuid) -> Result<bool, StoreError>;

    /// Application-level exclusive lease for consensus updates on one
    /// lead. Returns `false` when another task holds the lease.
    async fn try_acquire_lead_lease(&self, lead_id: &Uuid) -> Result<bool, StoreError>;

    async fn release_lead_lease(&self, lead_id: &Uuid) -> Result<(), StoreError>;
}

/// `validation_evidence_private` table.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Insert a hashed commit row.
    ///
    /// # Errors
    /// - `DuplicateCommit` when a row already exists for the
    ///   `(validator, lead, epoch)` triple
    async fn insert_commit(&self, evidence: ValidationEvidence) -> Result<(), StoreError>;

    async fn get_evidence(&self, evidence_id: &Uuid) -> Result<Option<ValidationEvidence>, StoreError>;

    /// Replace a row with its revealed form.
    async fn apply_reveal(&self, evidence: ValidationEvidence) -> Result<(), StoreError>;

    /// Revealed rows for one `(lead, epoch)` pair.
    async fn revealed_for_lead(
        &self,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<Vec<ValidationEvidence>, StoreError>;

    /// All rows a validator filed for an epoch.
    async fn by_validator_for_epoch(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Vec<ValidationEvidence>, StoreError>;

    async fn commit_exists(
        &self,
        validator_hotkey: &str,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<bool, StoreError>;

    async fn count_for_epoch(&self, epoch_id: u64) -> Result<usize, StoreError>;

    async fn revealed_count_for_epoch(&self, epoch_id: u64) -> Result<usize, StoreError>;

    /// Delete all evidence rows for a lead in batches of `batch_size`
    /// (row-store batch limits). Returns the number deleted.
    async fn delete_for_lead(&self, lead_id: &Uuid, batch_size: usize)
        -> Result<usize, StoreError>;
}

/// `transparency_log` table. Append-only.
#[async_trait]
pub trait TransparencyLogStore: Send + Sync {
    /// Append a log entry.
    ///
    /// # Errors
    /// - `NonceReplayed` when the payload carries a nonce already seen
    /// - `DuplicateEpochInitialization` for a second init of one epoch
    async fn append_entry(&self, entry: LogEntry) -> Result<(), StoreError>;

    /// `event_hash` of the newest entry, for boot-time chain linkage.
    async fn latest_tip(&self) -> Result<Option<String>, StoreError>;

    /// The canonical `EPOCH_INITIALIZATION` entry for an epoch.
    async fn epoch_initialization(&self, epoch_id: u64) -> Result<Option<LogEntry>, StoreError>;

    /// All entries of one type, oldest first.
    async fn entries_by_type(&self, event_type: EventType) -> Result<Vec<LogEntry>, StoreError>;

    /// Entries in append order (for audits and tests).
    async fn all_entries(&self) -> Result<Vec<LogEntry>, StoreError>;

    async fn entry_count(&self) -> Result<usize, StoreError>;
}

/// `merkle_checkpoints` table.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn insert_checkpoint(&self, record: CheckpointRecord) -> Result<(), StoreError>;

    /// Record the permanent-storage transaction id after confirmation.
    async fn set_checkpoint_tx_id(
        &self,
        checkpoint_number: u64,
        tx_id: &str,
    ) -> Result<(), StoreError>;

    async fn latest_checkpoint(&self) -> Result<Option<CheckpointRecord>, StoreError>;

    async fn get_checkpoint(
        &self,
        checkpoint_number: u64,
    ) -> Result<Option<CheckpointRecord>, StoreError>;
}

/// Per-miner submission accounting.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// CAS-style slot reservation against the rolling caps.
    ///
    /// # Errors
    /// - `RateLimited` when either cap is reached
    async fn try_reserve_slot(
        &self,
        miner_hotkey: &str,
        config: &RateLimitConfig,
    ) -> Result<SubmissionCounters, StoreError>;

    /// Release a slot for an ingress-rejected submission.
    async fn release_failed_slot(&self, miner_hotkey: &str) -> Result<(), StoreError>;

    /// Resolve a reservation with a consensus outcome. A deny increments
    /// `rejections` exactly once; the submission count is untouched.
    async fn resolve_slot(&self, miner_hotkey: &str, denied: bool) -> Result<(), StoreError>;

    async fn get_counters(&self, miner_hotkey: &str) -> Result<SubmissionCounters, StoreError>;
}

/// Validator epoch-completion manifests.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// # Errors
    /// - `DuplicateManifest` for a second manifest from one validator in
    ///   one epoch
    async fn insert_manifest(&self, manifest: ValidatorManifest) -> Result<(), StoreError>;

    async fn get_manifest(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Option<ValidatorManifest>, StoreError>;

    async fn manifests_for_epoch(&self, epoch_id: u64)
        -> Result<Vec<ValidatorManifest>, StoreError>;
}

/// The full table set, as one object the application context can share.
pub trait GatewayStore:
    LeadStore
    + EvidenceStore
    + TransparencyLogStore
    + CheckpointStore
    + CounterStore
    + ManifestStore
{
}

impl<T> GatewayStore for T where
    T: LeadStore
        + EvidenceStore
        + TransparencyLogStore
        + CheckpointStore
        + CounterStore
        + ManifestStore
{
}
