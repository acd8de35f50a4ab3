//! # RocksDB Storage Adapter
//!
//! Production implementation of the gateway's row-store ports, one
//! column family per table plus index families for the uniqueness
//! constraints.
//!
//! ## Column Families
//!
//! - `leads` / `lead_fingerprints` - lead rows and the fingerprint index
//! - `evidence` / `commit_keys` - evidence rows and the
//!   `(validator, lead, epoch)` index
//! - `log` / `log_nonces` / `epoch_inits` - the transparency log,
//!   append-indexed, with nonce and single-initialization indexes
//! - `checkpoints`, `counters`, `manifests`, `meta`
//!
//! Multi-family updates go through a `WriteBatch` under a process-wide
//! write lock; the gateway is single-process, so the lock is about
//! batch atomicity, not cross-process safety.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lg_03_store::{
    CheckpointStore, CounterStore, EvidenceStore, LeadStore, ManifestStore, StoreError,
    TransparencyLogStore,
};
use parking_lot::Mutex;
use rocksdb::{
    ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded, Options, WriteBatch,
};
use shared_types::{
    CheckpointRecord, ConsensusSnapshot, EventType, Lead, LeadStatus, LogEntry, RateLimitConfig,
    SubmissionCounters, ValidationEvidence, ValidatorManifest,
};
use uuid::Uuid;

pub const CF_LEADS: &str = "leads";
pub const CF_LEAD_FINGERPRINTS: &str = "lead_fingerprints";
pub const CF_EVIDENCE: &str = "evidence";
pub const CF_COMMIT_KEYS: &str = "commit_keys";
pub const CF_LOG: &str = "log";
pub const CF_LOG_NONCES: &str = "log_nonces";
pub const CF_EPOCH_INITS: &str = "epoch_inits";
pub const CF_CHECKPOINTS: &str = "checkpoints";
pub const CF_COUNTERS: &str = "counters";
pub const CF_MANIFESTS: &str = "manifests";
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: &[&str] = &[
    CF_LEADS,
    CF_LEAD_FINGERPRINTS,
    CF_EVIDENCE,
    CF_COMMIT_KEYS,
    CF_LOG,
    CF_LOG_NONCES,
    CF_EPOCH_INITS,
    CF_CHECKPOINTS,
    CF_COUNTERS,
    CF_MANIFESTS,
    CF_META,
];

const META_LOG_LEN: &[u8] = b"log_len";

/// RocksDB tuning for the gateway workload.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: String,
    pub write_buffer_size: usize,
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }

    /// Smaller buffers, no fsync; for tests.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// Thread-safe handle type: column families are resolved per call from
/// concurrent async tasks.
type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB-backed gateway store.
pub struct RocksStore {
    db: Db,
    sync_writes: bool,
    /// Serializes read-modify-write sequences spanning families.
    write_lock: Mutex<()>,
    /// Leases are process-local coordination, not persistent state.
    lead_leases: Mutex<HashSet<Uuid>>,
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(backend)
}

fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(backend)
}

impl RocksStore {
    /// Open or create the database with all column families.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, Path::new(&config.path), cf_descriptors)
            .map_err(backend)?;
        Ok(Self {
            db,
            sync_writes: config.sync_writes,
            write_lock: Mutex::new(()),
            lead_leases: Mutex::new(HashSet::new()),
        })
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        self.db.write_opt(batch, &write_opts).map_err(backend)
    }

    fn cf(&self, name: &str) -> Result<Arc<rocksdb::BoundColumnFamily<'_>>, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("missing column family {name}")))
    }

    fn get_cf<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, key).map_err(backend)? {
            Some(bytes) => Ok(Some(from_json(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_cf<T: serde::Serialize>(
        &self,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<(), StoreError> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(&cf, key, to_json(value)?)
            .map_err(backend)
    }

    fn scan_cf<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
    ) -> Result<Vec<T>, StoreError> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(backend)?;
            rows.push(from_json(&value)?);
        }
        Ok(rows)
    }

    fn log_len(&self) -> Result<u64, StoreError> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(&cf, META_LOG_LEN).map_err(backend)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| StoreError::Backend("corrupt log_len".to_string()))?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn commit_key(validator: &str, lead_id: &Uuid, epoch_id: u64) -> Vec<u8> {
        format!("{validator}:{lead_id}:{epoch_id}").into_bytes()
    }

    fn manifest_key(validator: &str, epoch_id: u64) -> Vec<u8> {
        format!("{validator}:{epoch_id}").into_bytes()
    }
}

#[async_trait]
impl LeadStore for RocksStore {
    async fn insert_lead(&self, lead: Lead) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let fp_cf = self.cf(CF_LEAD_FINGERPRINTS)?;

        for (name, hash) in [
            ("email_hash", &lead.email_hash),
            ("linkedin_combo_hash", &lead.linkedin_combo_hash),
        ] {
            if !hash.is_empty()
                && self
                    .db
                    .get_cf(&fp_cf, hash.as_bytes())
                    .map_err(backend)?
                    .is_some()
            {
                return Err(StoreError::DuplicateFingerprint(name.to_string()));
            }
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(CF_LEADS)?, lead.lead_id.as_bytes(), to_json(&lead)?);
        for hash in [&lead.email_hash, &lead.linkedin_combo_hash] {
            if !hash.is_empty() {
                batch.put_cf(&fp_cf, hash.as_bytes(), lead.lead_id.as_bytes());
            }
        }
        self.write_batch(batch)
    }

    async fn get_lead(&self, lead_id: &Uuid) -> Result<Option<Lead>, StoreError> {
        self.get_cf(CF_LEADS, lead_id.as_bytes())
    }

    async fn leads_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, StoreError> {
        let mut leads = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(lead) = self.get_cf::<Lead>(CF_LEADS, id.as_bytes())? {
                leads.push(lead);
            }
        }
        Ok(leads)
    }

    async fn oldest_pending(&self, limit: usize) -> Result<Vec<Lead>, StoreError> {
        let mut pending: Vec<Lead> = self
            .scan_cf::<Lead>(CF_LEADS)?
            .into_iter()
            .filter(|l| l.status == LeadStatus::PendingValidation)
            .collect();
        pending.sort_by(|a, b| {
            a.created_ts
                .cmp(&b.created_ts)
                .then_with(|| a.lead_id.cmp(&b.lead_id))
        });
        pending.truncate(limit);
        Ok(pending)
    }

    async fn pending_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .scan_cf::<Lead>(CF_LEADS)?
            .into_iter()
            .filter(|l| l.status == LeadStatus::PendingValidation)
            .count())
    }

    async fn mark_validating(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let leads_cf = self.cf(CF_LEADS)?;
        let mut batch = WriteBatch::default();
        for id in ids {
            let mut lead: Lead = self
                .get_cf(CF_LEADS, id.as_bytes())?
                .ok_or(StoreError::NotFound)?;
            if !lead.status.can_transition_to(LeadStatus::Validating) {
                return Err(StoreError::InvalidTransition {
                    from: lead.status,
                    to: LeadStatus::Validating,
                });
            }
            lead.status = LeadStatus::Validating;
            batch.put_cf(&leads_cf, id.as_bytes(), to_json(&lead)?);
        }
        self.write_batch(batch)
    }

    async fn apply_consensus(
        &self,
        lead_id: &Uuid,
        status: LeadStatus,
        snapshot: Option<ConsensusSnapshot>,
        icp_multiplier: Option<f64>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut lead: Lead = self
            .get_cf(CF_LEADS, lead_id.as_bytes())?
            .ok_or(StoreError::NotFound)?;
        if lead.status != status && !lead.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: lead.status,
                to: status,
            });
        }
        lead.status = status;
        lead.consensus_snapshot = snapshot;
        lead.icp_multiplier = icp_multiplier;
        self.put_cf(CF_LEADS, lead_id.as_bytes(), &lead)
    }

    async fn fingerprint_exists(
        &self,
        email_hash: &str,
        linkedin_combo_hash: &str,
    ) -> Result<bool, StoreError> {
        let fp_cf = self.cf(CF_LEAD_FINGERPRINTS)?;
        for hash in [email_hash, linkedin_combo_hash] {
            if !hash.is_empty()
                && self
                    .db
                    .get_cf(&fp_cf, hash.as_bytes())
                    .map_err(backend)?
                    .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn nonfinal_leads(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(self
            .scan_cf::<Lead>(CF_LEADS)?
            .into_iter()
            .filter(|l| l.status.is_sweepable())
            .collect())
    }

    async fn delete_lead(&self, lead_id: &Uuid) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let Some(lead) = self.get_cf::<Lead>(CF_LEADS, lead_id.as_bytes())? else {
            return Ok(false);
        };
        let mut batch = WriteBatch::default();
        batch.delete_cf(&self.cf(CF_LEADS)?, lead_id.as_bytes());
        let fp_cf = self.cf(CF_LEAD_FINGERPRINTS)?;
        for hash in [&lead.email_hash, &lead.linkedin_combo_hash] {
            if !hash.is_empty() {
                batch.delete_cf(&fp_cf, hash.as_bytes());
            }
        }
        self.write_batch(batch)?;
        Ok(true)
    }

    async fn try_acquire_lead_lease(&self, lead_id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.lead_leases.lock().insert(*lead_id))
    }

    async fn release_lead_lease(&self, lead_id: &Uuid) -> Result<(), StoreError> {
        self.lead_leases.lock().remove(lead_id);
        Ok(())
    }
}

#[async_trait]
impl EvidenceStore for RocksStore {
    async fn insert_commit(&self, evidence: ValidationEvidence) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let key = Self::commit_key(
            &evidence.validator_hotkey,
            &evidence.lead_id,
            evidence.epoch_id,
        );
        let keys_cf = self.cf(CF_COMMIT_KEYS)?;
        if self.db.get_cf(&keys_cf, &key).map_err(backend)?.is_some() {
            return Err(StoreError::DuplicateCommit);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &self.cf(CF_EVIDENCE)?,
            evidence.evidence_id.as_bytes(),
            to_json(&evidence)?,
        );
        batch.put_cf(&keys_cf, &key, evidence.evidence_id.as_bytes());
        self.write_batch(batch)
    }

    async fn get_evidence(
        &self,
        evidence_id: &Uuid,
    ) -> Result<Option<ValidationEvidence>, StoreError> {
        self.get_cf(CF_EVIDENCE, evidence_id.as_bytes())
    }

    async fn apply_reveal(&self, evidence: ValidationEvidence) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        if self
            .get_cf::<ValidationEvidence>(CF_EVIDENCE, evidence.evidence_id.as_bytes())?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }
        self.put_cf(CF_EVIDENCE, evidence.evidence_id.as_bytes(), &evidence)
    }

    async fn revealed_for_lead(
        &self,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<Vec<ValidationEvidence>, StoreError> {
        Ok(self
            .scan_cf::<ValidationEvidence>(CF_EVIDENCE)?
            .into_iter()
            .filter(|e| e.lead_id == *lead_id && e.epoch_id == epoch_id && e.is_revealed())
            .collect())
    }

    async fn by_validator_for_epoch(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Vec<ValidationEvidence>, StoreError> {
        let mut rows: Vec<ValidationEvidence> = self
            .scan_cf::<ValidationEvidence>(CF_EVIDENCE)?
            .into_iter()
            .filter(|e| e.validator_hotkey == validator_hotkey && e.epoch_id == epoch_id)
            .collect();
        rows.sort_by_key(|e| e.evidence_id);
        Ok(rows)
    }

    async fn commit_exists(
        &self,
        validator_hotkey: &str,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<bool, StoreError> {
        let key = Self::commit_key(validator_hotkey, lead_id, epoch_id);
        let keys_cf = self.cf(CF_COMMIT_KEYS)?;
        Ok(self.db.get_cf(&keys_cf, &key).map_err(backend)?.is_some())
    }

    async fn count_for_epoch(&self, epoch_id: u64) -> Result<usize, StoreError> {
        Ok(self
            .scan_cf::<ValidationEvidence>(CF_EVIDENCE)?
            .into_iter()
            .filter(|e| e.epoch_id == epoch_id)
            .count())
    }

    async fn revealed_count_for_epoch(&self, epoch_id: u64) -> Result<usize, StoreError> {
        Ok(self
            .scan_cf::<ValidationEvidence>(CF_EVIDENCE)?
            .into_iter()
            .filter(|e| e.epoch_id == epoch_id && e.is_revealed())
            .count())
    }

    async fn delete_for_lead(
        &self,
        lead_id: &Uuid,
        batch_size: usize,
    ) -> Result<usize, StoreError> {
        let mut deleted = 0;
        loop {
            let _guard = self.write_lock.lock();
            let rows: Vec<ValidationEvidence> = self
                .scan_cf::<ValidationEvidence>(CF_EVIDENCE)?
                .into_iter()
                .filter(|e| e.lead_id == *lead_id)
                .take(batch_size)
                .collect();
            if rows.is_empty() {
                return Ok(deleted);
            }
            let mut batch = WriteBatch::default();
            let evidence_cf = self.cf(CF_EVIDENCE)?;
            let keys_cf = self.cf(CF_COMMIT_KEYS)?;
            for row in &rows {
                batch.delete_cf(&evidence_cf, row.evidence_id.as_bytes());
                batch.delete_cf(
                    &keys_cf,
                    Self::commit_key(&row.validator_hotkey, &row.lead_id, row.epoch_id),
                );
            }
            deleted += rows.len();
            self.write_batch(batch)?;
        }
    }
}

#[async_trait]
impl TransparencyLogStore for RocksStore {
    async fn append_entry(&self, entry: LogEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let nonces_cf = self.cf(CF_LOG_NONCES)?;
        let nonce = entry
            .signed_event
            .payload
            .get("nonce")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        if let Some(nonce) = nonce {
            if self
                .db
                .get_cf(&nonces_cf, nonce.as_bytes())
                .map_err(backend)?
                .is_some()
            {
                return Err(StoreError::NonceReplayed);
            }
        }

        let inits_cf = self.cf(CF_EPOCH_INITS)?;
        let init_epoch = if entry.signed_event.event_type == EventType::EpochInitialization {
            entry
                .signed_event
                .payload
                .get("epoch_id")
                .and_then(|v| v.as_u64())
        } else {
            None
        };
        if let Some(epoch_id) = init_epoch {
            if self
                .db
                .get_cf(&inits_cf, epoch_id.to_be_bytes())
                .map_err(backend)?
                .is_some()
            {
                return Err(StoreError::DuplicateEpochInitialization(epoch_id));
            }
        }

        let index = self.log_len()?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(CF_LOG)?, index.to_be_bytes(), to_json(&entry)?);
        batch.put_cf(&self.cf(CF_META)?, META_LOG_LEN, (index + 1).to_be_bytes());
        if let Some(nonce) = nonce {
            batch.put_cf(&nonces_cf, nonce.as_bytes(), []);
        }
        if let Some(epoch_id) = init_epoch {
            batch.put_cf(&inits_cf, epoch_id.to_be_bytes(), index.to_be_bytes());
        }
        self.write_batch(batch)
    }

    async fn latest_tip(&self) -> Result<Option<String>, StoreError> {
        let len = self.log_len()?;
        if len == 0 {
            return Ok(None);
        }
        let entry: Option<LogEntry> = self.get_cf(CF_LOG, &(len - 1).to_be_bytes())?;
        Ok(entry.map(|e| e.event_hash))
    }

    async fn epoch_initialization(&self, epoch_id: u64) -> Result<Option<LogEntry>, StoreError> {
        let inits_cf = self.cf(CF_EPOCH_INITS)?;
        let Some(index_bytes) = self
            .db
            .get_cf(&inits_cf, epoch_id.to_be_bytes())
            .map_err(backend)?
        else {
            return Ok(None);
        };
        self.get_cf(CF_LOG, &index_bytes)
    }

    async fn entries_by_type(&self, event_type: EventType) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .scan_cf::<LogEntry>(CF_LOG)?
            .into_iter()
            .filter(|e| e.signed_event.event_type == event_type)
            .collect())
    }

    async fn all_entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.scan_cf(CF_LOG)
    }

    async fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.log_len()? as usize)
    }
}

#[async_trait]
impl CheckpointStore for RocksStore {
    async fn insert_checkpoint(&self, record: CheckpointRecord) -> Result<(), StoreError> {
        self.put_cf(
            CF_CHECKPOINTS,
            &record.header.checkpoint_number.to_be_bytes(),
            &record,
        )
    }

    async fn set_checkpoint_tx_id(
        &self,
        checkpoint_number: u64,
        tx_id: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut record: CheckpointRecord = self
            .get_cf(CF_CHECKPOINTS, &checkpoint_number.to_be_bytes())?
            .ok_or(StoreError::NotFound)?;
        record.arweave_tx_id = Some(tx_id.to_string());
        self.put_cf(CF_CHECKPOINTS, &checkpoint_number.to_be_bytes(), &record)
    }

    async fn latest_checkpoint(&self) -> Result<Option<CheckpointRecord>, StoreError> {
        let cf = self.cf(CF_CHECKPOINTS)?;
        match self.db.iterator_cf(&cf, IteratorMode::End).next() {
            Some(item) => {
                let (_, value) = item.map_err(backend)?;
                Ok(Some(from_json(&value)?))
            }
            None => Ok(None),
        }
    }

    async fn get_checkpoint(
        &self,
        checkpoint_number: u64,
    ) -> Result<Option<CheckpointRecord>, StoreError> {
        self.get_cf(CF_CHECKPOINTS, &checkpoint_number.to_be_bytes())
    }
}

#[async_trait]
impl CounterStore for RocksStore {
    async fn try_reserve_slot(
        &self,
        miner_hotkey: &str,
        config: &RateLimitConfig,
    ) -> Result<SubmissionCounters, StoreError> {
        let _guard = self.write_lock.lock();
        let now = chrono::Utc::now();
        let mut counters: SubmissionCounters = self
            .get_cf(CF_COUNTERS, miner_hotkey.as_bytes())?
            .unwrap_or_else(|| SubmissionCounters::new(now));
        counters.try_reserve(config, now)?;
        self.put_cf(CF_COUNTERS, miner_hotkey.as_bytes(), &counters)?;
        Ok(counters)
    }

    async fn release_failed_slot(&self, miner_hotkey: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        if let Some(mut counters) =
            self.get_cf::<SubmissionCounters>(CF_COUNTERS, miner_hotkey.as_bytes())?
        {
            counters.release_failed();
            self.put_cf(CF_COUNTERS, miner_hotkey.as_bytes(), &counters)?;
        }
        Ok(())
    }

    async fn resolve_slot(&self, miner_hotkey: &str, denied: bool) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let now = chrono::Utc::now();
        let mut counters: SubmissionCounters = self
            .get_cf(CF_COUNTERS, miner_hotkey.as_bytes())?
            .unwrap_or_else(|| SubmissionCounters::new(now));
        counters.resolve(denied);
        self.put_cf(CF_COUNTERS, miner_hotkey.as_bytes(), &counters)
    }

    async fn get_counters(&self, miner_hotkey: &str) -> Result<SubmissionCounters, StoreError> {
        Ok(self
            .get_cf(CF_COUNTERS, miner_hotkey.as_bytes())?
            .unwrap_or_else(|| SubmissionCounters::new(chrono::Utc::now())))
    }
}

#[async_trait]
impl ManifestStore for RocksStore {
    async fn insert_manifest(&self, manifest: ValidatorManifest) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let key = Self::manifest_key(&manifest.validator_hotkey, manifest.epoch_id);
        let cf = self.cf(CF_MANIFESTS)?;
        if self.db.get_cf(&cf, &key).map_err(backend)?.is_some() {
            return Err(StoreError::DuplicateManifest);
        }
        self.db
            .put_cf(&cf, &key, to_json(&manifest)?)
            .map_err(backend)
    }

    async fn get_manifest(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Option<ValidatorManifest>, StoreError> {
        self.get_cf(CF_MANIFESTS, &Self::manifest_key(validator_hotkey, epoch_id))
    }

    async fn manifests_for_epoch(
        &self,
        epoch_id: u64,
    ) -> Result<Vec<ValidatorManifest>, StoreError> {
        let mut rows: Vec<ValidatorManifest> = self
            .scan_cf::<ValidatorManifest>(CF_MANIFESTS)?
            .into_iter()
            .filter(|m| m.epoch_id == epoch_id)
            .collect();
        rows.sort_by(|a, b| a.validator_hotkey.cmp(&b.validator_hotkey));
        Ok(rows)
    }
}
