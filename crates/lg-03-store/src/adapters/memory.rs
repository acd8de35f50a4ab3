//! # In-Memory Store Adapter
//!
//! Backs the unit and integration suites, and local runs without a data
//! directory. Enforces exactly the same invariants the production
//! adapter must: fingerprint uniqueness, commit uniqueness, nonce
//! uniqueness, one epoch initialization, and monotonic lead transitions.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    CheckpointRecord, ConsensusSnapshot, EventType, Lead, LeadStatus, LogEntry, RateLimitConfig,
    SubmissionCounters, ValidationEvidence, ValidatorManifest,
};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::ports::{
    CheckpointStore, CounterStore, EvidenceStore, LeadStore, ManifestStore, TransparencyLogStore,
};

/// All gateway tables in memory.
#[derive(Default)]
pub struct MemoryStore {
    leads: RwLock<HashMap<Uuid, Lead>>,
    /// Fingerprints of non-removed leads (email and combo hashes share
    /// one namespace; both are SHA-256 hex so they cannot collide).
    fingerprints: RwLock<HashSet<String>>,
    lead_leases: Mutex<HashSet<Uuid>>,

    evidence: RwLock<HashMap<Uuid, ValidationEvidence>>,
    commit_keys: RwLock<HashSet<(String, Uuid, u64)>>,

    log: RwLock<Vec<LogEntry>>,
    nonces: RwLock<HashSet<Uuid>>,
    epoch_inits: RwLock<HashMap<u64, usize>>,

    checkpoints: RwLock<BTreeMap<u64, CheckpointRecord>>,
    counters: Mutex<HashMap<String, SubmissionCounters>>,
    manifests: RwLock<HashMap<(String, u64), ValidatorManifest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_fingerprints(set: &mut HashSet<String>, lead: &Lead) {
        if !lead.email_hash.is_empty() {
            set.insert(lead.email_hash.clone());
        }
        if !lead.linkedin_combo_hash.is_empty() {
            set.insert(lead.linkedin_combo_hash.clone());
        }
    }

    fn unindex_fingerprints(set: &mut HashSet<String>, lead: &Lead) {
        set.remove(&lead.email_hash);
        set.remove(&lead.linkedin_combo_hash);
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, lead: Lead) -> Result<(), StoreError> {
        let mut fingerprints = self.fingerprints.write();
        if !lead.email_hash.is_empty() && fingerprints.contains(&lead.email_hash) {
            return Err(StoreError::DuplicateFingerprint("email_hash".to_string()));
        }
        if !lead.linkedin_combo_hash.is_empty()
            && fingerprints.contains(&lead.linkedin_combo_hash)
        {
            return Err(StoreError::DuplicateFingerprint(
                "linkedin_combo_hash".to_string(),
            ));
        }
        Self::index_fingerprints(&mut fingerprints, &lead);
        self.leads.write().insert(lead.lead_id, lead);
        Ok(())
    }

    async fn get_lead(&self, lead_id: &Uuid) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.read().get(lead_id).cloned())
    }

    async fn leads_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, StoreError> {
        let leads = self.leads.read();
        Ok(ids.iter().filter_map(|id| leads.get(id).cloned()).collect())
    }

    async fn oldest_pending(&self, limit: usize) -> Result<Vec<Lead>, StoreError> {
        let leads = self.leads.read();
        let mut pending: Vec<Lead> = leads
            .values()
            .filter(|l| l.status == LeadStatus::PendingValidation)
            .cloned()
            .collect();
        // FIFO by submission time; lead id breaks exact ties stably.
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
            .leads
            .read()
            .values()
            .filter(|l| l.status == LeadStatus::PendingValidation)
            .count())
    }

    async fn mark_validating(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let mut leads = self.leads.write();
        for id in ids {
            let lead = leads.get_mut(id).ok_or(StoreError::NotFound)?;
            if !lead.status.can_transition_to(LeadStatus::Validating) {
                return Err(StoreError::InvalidTransition {
                    from: lead.status,
                    to: LeadStatus::Validating,
                });
            }
            lead.status = LeadStatus::Validating;
        }
        Ok(())
    }

    async fn apply_consensus(
        &self,
        lead_id: &Uuid,
        status: LeadStatus,
        snapshot: Option<ConsensusSnapshot>,
        icp_multiplier: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut leads = self.leads.write();
        let lead = leads.get_mut(lead_id).ok_or(StoreError::NotFound)?;
        if lead.status != status && !lead.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: lead.status,
                to: status,
            });
        }
        lead.status = status;
        lead.consensus_snapshot = snapshot;
        lead.icp_multiplier = icp_multiplier;
        Ok(())
    }

    async fn fingerprint_exists(
        &self,
        email_hash: &str,
        linkedin_combo_hash: &str,
    ) -> Result<bool, StoreError> {
        let fingerprints = self.fingerprints.read();
        let email_hit = !email_hash.is_empty() && fingerprints.contains(email_hash);
        let combo_hit =
            !linkedin_combo_hash.is_empty() && fingerprints.contains(linkedin_combo_hash);
        Ok(email_hit || combo_hit)
    }

    async fn nonfinal_leads(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(self
            .leads
            .read()
            .values()
            .filter(|l| l.status.is_sweepable())
            .cloned()
            .collect())
    }

    async fn delete_lead(&self, lead_id: &Uuid) -> Result<bool, StoreError> {
        let removed = self.leads.write().remove(lead_id);
        if let Some(lead) = &removed {
            Self::unindex_fingerprints(&mut self.fingerprints.write(), lead);
        }
        Ok(removed.is_some())
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
impl EvidenceStore for MemoryStore {
    async fn insert_commit(&self, evidence: ValidationEvidence) -> Result<(), StoreError> {
        let key = (
            evidence.validator_hotkey.clone(),
            evidence.lead_id,
            evidence.epoch_id,
        );
        let mut keys = self.commit_keys.write();
        if keys.contains(&key) {
            return Err(StoreError::DuplicateCommit);
        }
        keys.insert(key);
        self.evidence
            .write()
            .insert(evidence.evidence_id, evidence);
        Ok(())
    }

    async fn get_evidence(
        &self,
        evidence_id: &Uuid,
    ) -> Result<Option<ValidationEvidence>, StoreError> {
        Ok(self.evidence.read().get(evidence_id).cloned())
    }

    async fn apply_reveal(&self, evidence: ValidationEvidence) -> Result<(), StoreError> {
        let mut rows = self.evidence.write();
        if !rows.contains_key(&evidence.evidence_id) {
            return Err(StoreError::NotFound);
        }
        rows.insert(evidence.evidence_id, evidence);
        Ok(())
    }

    async fn revealed_for_lead(
        &self,
        lead_id: &Uuid,
        epoch_id: u64,
    ) -> Result<Vec<ValidationEvidence>, StoreError> {
        Ok(self
            .evidence
            .read()
            .values()
            .filter(|e| e.lead_id == *lead_id && e.epoch_id == epoch_id && e.is_revealed())
            .cloned()
            .collect())
    }

    async fn by_validator_for_epoch(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Vec<ValidationEvidence>, StoreError> {
        let mut rows: Vec<ValidationEvidence> = self
            .evidence
            .read()
            .values()
            .filter(|e| e.validator_hotkey == validator_hotkey && e.epoch_id == epoch_id)
            .cloned()
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
        Ok(self.commit_keys.read().contains(&(
            validator_hotkey.to_string(),
            *lead_id,
            epoch_id,
        )))
    }

    async fn count_for_epoch(&self, epoch_id: u64) -> Result<usize, StoreError> {
        Ok(self
            .evidence
            .read()
            .values()
            .filter(|e| e.epoch_id == epoch_id)
            .count())
    }

    async fn revealed_count_for_epoch(&self, epoch_id: u64) -> Result<usize, StoreError> {
        Ok(self
            .evidence
            .read()
            .values()
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
            let batch: Vec<Uuid> = {
                let rows = self.evidence.read();
                rows.values()
                    .filter(|e| e.lead_id == *lead_id)
                    .take(batch_size)
                    .map(|e| e.evidence_id)
                    .collect()
            };
            if batch.is_empty() {
                return Ok(deleted);
            }
            let mut rows = self.evidence.write();
            let mut keys = self.commit_keys.write();
            for id in batch {
                if let Some(row) = rows.remove(&id) {
                    keys.remove(&(row.validator_hotkey.clone(), row.lead_id, row.epoch_id));
                    deleted += 1;
                }
            }
        }
    }
}

#[async_trait]
impl TransparencyLogStore for MemoryStore {
    async fn append_entry(&self, entry: LogEntry) -> Result<(), StoreError> {
        // Nonce uniqueness (payloads of boundary writes carry one).
        if let Some(nonce) = entry
            .signed_event
            .payload
            .get("nonce")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
        {
            let mut nonces = self.nonces.write();
            if !nonces.insert(nonce) {
                return Err(StoreError::NonceReplayed);
            }
        }

        // Exactly one EPOCH_INITIALIZATION per epoch.
        if entry.signed_event.event_type == EventType::EpochInitialization {
            if let Some(epoch_id) = entry
                .signed_event
                .payload
                .get("epoch_id")
                .and_then(|v| v.as_u64())
            {
                let mut inits = self.epoch_inits.write();
                if inits.contains_key(&epoch_id) {
                    return Err(StoreError::DuplicateEpochInitialization(epoch_id));
                }
                inits.insert(epoch_id, self.log.read().len());
            }
        }

        self.log.write().push(entry);
        Ok(())
    }

    async fn latest_tip(&self) -> Result<Option<String>, StoreError> {
        Ok(self.log.read().last().map(|e| e.event_hash.clone()))
    }

    async fn epoch_initialization(&self, epoch_id: u64) -> Result<Option<LogEntry>, StoreError> {
        let index = self.epoch_inits.read().get(&epoch_id).copied();
        Ok(index.and_then(|i| self.log.read().get(i).cloned()))
    }

    async fn entries_by_type(&self, event_type: EventType) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .log
            .read()
            .iter()
            .filter(|e| e.signed_event.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn all_entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self.log.read().clone())
    }

    async fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.log.read().len())
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn insert_checkpoint(&self, record: CheckpointRecord) -> Result<(), StoreError> {
        self.checkpoints
            .write()
            .insert(record.header.checkpoint_number, record);
        Ok(())
    }

    async fn set_checkpoint_tx_id(
        &self,
        checkpoint_number: u64,
        tx_id: &str,
    ) -> Result<(), StoreError> {
        let mut checkpoints = self.checkpoints.write();
        let record = checkpoints
            .get_mut(&checkpoint_number)
            .ok_or(StoreError::NotFound)?;
        record.arweave_tx_id = Some(tx_id.to_string());
        Ok(())
    }

    async fn latest_checkpoint(&self) -> Result<Option<CheckpointRecord>, StoreError> {
        Ok(self
            .checkpoints
            .read()
            .values()
            .next_back()
            .cloned())
    }

    async fn get_checkpoint(
        &self,
        checkpoint_number: u64,
    ) -> Result<Option<CheckpointRecord>, StoreError> {
        Ok(self.checkpoints.read().get(&checkpoint_number).cloned())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn try_reserve_slot(
        &self,
        miner_hotkey: &str,
        config: &RateLimitConfig,
    ) -> Result<SubmissionCounters, StoreError> {
        let now = Utc::now();
        let mut counters = self.counters.lock();
        let entry = counters
            .entry(miner_hotkey.to_string())
            .or_insert_with(|| SubmissionCounters::new(now));
        entry.try_reserve(config, now)?;
        Ok(entry.clone())
    }

    async fn release_failed_slot(&self, miner_hotkey: &str) -> Result<(), StoreError> {
        if let Some(entry) = self.counters.lock().get_mut(miner_hotkey) {
            entry.release_failed();
        }
        Ok(())
    }

    async fn resolve_slot(&self, miner_hotkey: &str, denied: bool) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut counters = self.counters.lock();
        let entry = counters
            .entry(miner_hotkey.to_string())
            .or_insert_with(|| SubmissionCounters::new(now));
        entry.resolve(denied);
        Ok(())
    }

    async fn get_counters(&self, miner_hotkey: &str) -> Result<SubmissionCounters, StoreError> {
        Ok(self
            .counters
            .lock()
            .get(miner_hotkey)
            .cloned()
            .unwrap_or_else(|| SubmissionCounters::new(Utc::now())))
    }
}

#[async_trait]
impl ManifestStore for MemoryStore {
    async fn insert_manifest(&self, manifest: ValidatorManifest) -> Result<(), StoreError> {
        let key = (manifest.validator_hotkey.clone(), manifest.epoch_id);
        let mut manifests = self.manifests.write();
        if manifests.contains_key(&key) {
            return Err(StoreError::DuplicateManifest);
        }
        manifests.insert(key, manifest);
        Ok(())
    }

    async fn get_manifest(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Option<ValidatorManifest>, StoreError> {
        Ok(self
            .manifests
            .read()
            .get(&(validator_hotkey.to_string(), epoch_id))
            .cloned())
    }

    async fn manifests_for_epoch(
        &self,
        epoch_id: u64,
    ) -> Result<Vec<ValidatorManifest>, StoreError> {
        let mut rows: Vec<ValidatorManifest> = self
            .manifests
            .read()
            .values()
            .filter(|m| m.epoch_id == epoch_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.validator_hotkey.cmp(&b.validator_hotkey));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use shared_types::SignedEvent;

    fn lead(email_hash: &str, combo: &str, created_offset_secs: i64) -> Lead {
        Lead {
            lead_id: Uuid::new_v4(),
            miner_hotkey: "5Miner".to_string(),
            lead_blob: json!({"email": "x"}),
            lead_blob_hash: "bh".to_string(),
            email_hash: email_hash.to_string(),
            linkedin_combo_hash: combo.to_string(),
            status: LeadStatus::PendingValidation,
            created_ts: Utc::now() + Duration::seconds(created_offset_secs),
            consensus_snapshot: None,
            icp_multiplier: None,
        }
    }

    fn entry(event_type: EventType, payload: serde_json::Value) -> LogEntry {
        LogEntry {
            signed_event: SignedEvent {
                event_type,
                timestamp: "2025-01-01T00:00:00.000000Z".to_string(),
                boot_id: Uuid::new_v4(),
                monotonic_seq: 0,
                prev_event_hash: shared_types::ZERO_HASH.to_string(),
                payload,
            },
            event_hash: Uuid::new_v4().to_string(),
            enclave_pubkey: String::new(),
            enclave_signature: String::new(),
        }
    }

    #[tokio::test]
    async fn test_fingerprint_uniqueness() {
        let store = MemoryStore::new();
        store.insert_lead(lead("e1", "c1", 0)).await.unwrap();
        assert!(matches!(
            store.insert_lead(lead("e1", "c2", 0)).await,
            Err(StoreError::DuplicateFingerprint(_))
        ));
        assert!(matches!(
            store.insert_lead(lead("e2", "c1", 0)).await,
            Err(StoreError::DuplicateFingerprint(_))
        ));
        // Empty combo hashes never collide with each other.
        store.insert_lead(lead("e3", "", 0)).await.unwrap();
        store.insert_lead(lead("e4", "", 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_fingerprint_freed_after_delete() {
        let store = MemoryStore::new();
        let l = lead("e1", "c1", 0);
        let id = l.lead_id;
        store.insert_lead(l).await.unwrap();
        assert!(store.fingerprint_exists("e1", "").await.unwrap());
        assert!(store.delete_lead(&id).await.unwrap());
        assert!(!store.fingerprint_exists("e1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_oldest_pending_fifo_order() {
        let store = MemoryStore::new();
        let l1 = lead("e1", "c1", 20);
        let l2 = lead("e2", "c2", 0);
        let l3 = lead("e3", "c3", 10);
        let expect = vec![l2.lead_id, l3.lead_id];
        for l in [l1, l2, l3] {
            store.insert_lead(l).await.unwrap();
        }
        let picked = store.oldest_pending(2).await.unwrap();
        let ids: Vec<Uuid> = picked.iter().map(|l| l.lead_id).collect();
        assert_eq!(ids, expect);
    }

    #[tokio::test]
    async fn test_commit_uniqueness() {
        let store = MemoryStore::new();
        let lead_id = Uuid::new_v4();
        let mk = |id: Uuid| ValidationEvidence {
            evidence_id: id,
            validator_hotkey: "5V".to_string(),
            lead_id,
            epoch_id: 9,
            decision_hash: "d".to_string(),
            rep_score_hash: "r".to_string(),
            rejection_reason_hash: "j".to_string(),
            evidence_blob: json!({}),
            decision: None,
            rep_score: None,
            rejection_reason: None,
            salt: None,
            v_trust: None,
            stake: None,
            revealed_ts: None,
        };
        store.insert_commit(mk(Uuid::new_v4())).await.unwrap();
        assert_eq!(
            store.insert_commit(mk(Uuid::new_v4())).await,
            Err(StoreError::DuplicateCommit)
        );
        assert!(store.commit_exists("5V", &lead_id, 9).await.unwrap());
    }

    #[tokio::test]
    async fn test_nonce_replay_rejected() {
        let store = MemoryStore::new();
        let nonce = Uuid::new_v4();
        store
            .append_entry(entry(EventType::Submission, json!({"nonce": nonce})))
            .await
            .unwrap();
        assert_eq!(
            store
                .append_entry(entry(EventType::Submission, json!({"nonce": nonce})))
                .await,
            Err(StoreError::NonceReplayed)
        );
    }

    #[tokio::test]
    async fn test_single_epoch_initialization() {
        let store = MemoryStore::new();
        store
            .append_entry(entry(EventType::EpochInitialization, json!({"epoch_id": 5})))
            .await
            .unwrap();
        assert_eq!(
            store
                .append_entry(entry(EventType::EpochInitialization, json!({"epoch_id": 5})))
                .await,
            Err(StoreError::DuplicateEpochInitialization(5))
        );
        assert!(store.epoch_initialization(5).await.unwrap().is_some());
        assert!(store.epoch_initialization(6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_tip_follows_appends() {
        let store = MemoryStore::new();
        assert_eq!(store.latest_tip().await.unwrap(), None);
        let e = entry(EventType::EpochEnd, json!({"epoch_id": 1}));
        let hash = e.event_hash.clone();
        store.append_entry(e).await.unwrap();
        assert_eq!(store.latest_tip().await.unwrap(), Some(hash));
    }

    #[tokio::test]
    async fn test_lead_lease_exclusive() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(store.try_acquire_lead_lease(&id).await.unwrap());
        assert!(!store.try_acquire_lead_lease(&id).await.unwrap());
        store.release_lead_lease(&id).await.unwrap();
        assert!(store.try_acquire_lead_lease(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_manifest_uniqueness() {
        let store = MemoryStore::new();
        let manifest = ValidatorManifest {
            validator_hotkey: "5V".to_string(),
            epoch_id: 4,
            evidence_merkle_root: "root".to_string(),
            evidence_count: 50,
            submitted_ts: Utc::now(),
        };
        store.insert_manifest(manifest.clone()).await.unwrap();
        assert_eq!(
            store.insert_manifest(manifest).await,
            Err(StoreError::DuplicateManifest)
        );
    }
}
