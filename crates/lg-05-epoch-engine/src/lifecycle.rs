//! # Epoch Lifecycle
//!
//! The transitions the tracker schedules. Each is atomic at the
//! log-event level: the `EPOCH_INITIALIZATION` emit IS the commit point
//! of an initialization, and the store's unique constraint resolves any
//! race between the monitor and the ingress fallback path.

use std::sync::Arc;

use lg_02_registry::RegistryCache;
use lg_03_store::{
    EvidenceStore, GatewayStore, LeadStore, StoreError, TransparencyLogStore,
};
use lg_04_transparency::{TeeError, TransparencyLog};
use shared_types::{
    EpochAssignment, EpochEndPayload, EpochInitializationPayload, EpochInputsPayload,
    EventPayload, Lead, LogEntry, EPOCH_DURATION_BLOCKS, MAX_LEADS_PER_EPOCH,
};
use tracing::{info, warn};

use crate::assignment::build_assignment;
use crate::cache::{CachedEpoch, LeadCache};
use crate::errors::EpochError;

/// Who materialized an epoch initialization.
pub const CREATED_BY_MONITOR: &str = "epoch_monitor";
pub const CREATED_BY_FALLBACK: &str = "leads_fallback";

/// Executes epoch transitions against the stores and the log.
pub struct EpochLifecycle {
    store: Arc<dyn GatewayStore>,
    registry: Arc<RegistryCache>,
    log: Arc<TransparencyLog>,
    cache: Arc<LeadCache>,
}

impl EpochLifecycle {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        registry: Arc<RegistryCache>,
        log: Arc<TransparencyLog>,
        cache: Arc<LeadCache>,
    ) -> Self {
        Self {
            store,
            registry,
            log,
            cache,
        }
    }

    /// The prefetch cache, shared with the ingress.
    pub fn cache(&self) -> &Arc<LeadCache> {
        &self.cache
    }

    /// Initialize an epoch: one `EPOCH_INITIALIZATION` event carrying
    /// the assignment, the queue root, and the validator set.
    ///
    /// Idempotent: when the event already exists (emitted earlier, or
    /// concurrently by the other path), the canonical event's assignment
    /// is returned unchanged.
    pub async fn initialize_epoch(
        &self,
        epoch_id: u64,
        created_by: &str,
    ) -> Result<EpochAssignment, EpochError> {
        // Fast path: the event already exists.
        if let Some(entry) = self.log.store().epoch_initialization(epoch_id).await? {
            return assignment_from_entry(&entry);
        }

        // Prefer the prefetched snapshot; fall back to a live queue read.
        let (pending, pending_count) = match self.cache.get(epoch_id)? {
            Some(cached) => {
                let count = cached.assignment.pending_lead_count;
                (cached.leads, count)
            }
            None => {
                let pending = self.store.oldest_pending(MAX_LEADS_PER_EPOCH).await?;
                let count = self.store.pending_count().await?;
                (pending, count)
            }
        };

        let metagraph = self.registry.get_metagraph(epoch_id).await?;
        let assignment =
            build_assignment(epoch_id, &pending, pending_count, metagraph.validator_hotkeys());

        let payload = EventPayload::EpochInitialization(EpochInitializationPayload {
            epoch_id,
            assigned_lead_ids: assignment.assigned_lead_ids.clone(),
            queue_merkle_root: assignment.queue_merkle_root.clone(),
            validator_hotkeys: assignment.validator_hotkeys.clone(),
            pending_lead_count: assignment.pending_lead_count,
            created_by: created_by.to_string(),
        });

        match self.log.log_event(payload).await {
            Ok(_) => {
                // The emit is the commit point; everything after is
                // follow-up state that can be retried.
                self.store
                    .mark_validating(&assignment.assigned_lead_ids)
                    .await?;
                self.cache.insert(CachedEpoch {
                    assignment: assignment.clone(),
                    leads: pending
                        .into_iter()
                        .take(MAX_LEADS_PER_EPOCH)
                        .collect(),
                });
                info!(
                    epoch_id,
                    leads = assignment.assigned_lead_ids.len(),
                    validators = assignment.validator_hotkeys.len(),
                    created_by,
                    "epoch initialized"
                );
                Ok(assignment)
            }
            Err(TeeError::Store(StoreError::DuplicateEpochInitialization(_))) => {
                // Lost the race; the winner's event is canonical.
                let entry = self
                    .log
                    .store()
                    .epoch_initialization(epoch_id)
                    .await?
                    .ok_or(EpochError::NotInitialized(epoch_id))?;
                assignment_from_entry(&entry)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fallback materialization for the leads endpoint: validators may
    /// request an epoch's batch before the monitor has initialized it.
    pub async fn get_or_init_assignment(
        &self,
        epoch_id: u64,
    ) -> Result<EpochAssignment, EpochError> {
        if let Some(entry) = self.log.store().epoch_initialization(epoch_id).await? {
            return assignment_from_entry(&entry);
        }
        warn!(epoch_id, "assignment requested before initialization, materializing");
        self.initialize_epoch(epoch_id, CREATED_BY_FALLBACK).await
    }

    /// The full lead rows of an epoch's assignment, cache-first.
    pub async fn epoch_leads(&self, epoch_id: u64) -> Result<Vec<Lead>, EpochError> {
        if let Some(cached) = self.cache.get(epoch_id)? {
            return Ok(cached.leads);
        }
        let assignment = self.get_or_init_assignment(epoch_id).await?;
        Ok(self.store.leads_by_ids(&assignment.assigned_lead_ids).await?)
    }

    /// Close an epoch's validation phase: `EPOCH_END` then
    /// `EPOCH_INPUTS` summarising what the epoch received.
    pub async fn end_validation(&self, epoch_id: u64) -> Result<(), EpochError> {
        let assignment = match self.log.store().epoch_initialization(epoch_id).await? {
            Some(entry) => Some(assignment_from_entry(&entry)?),
            None => None,
        };

        self.log
            .log_event(EventPayload::EpochEnd(EpochEndPayload {
                epoch_id,
                end_block: (epoch_id + 1) * EPOCH_DURATION_BLOCKS,
            }))
            .await?;

        let commit_count = self.store.count_for_epoch(epoch_id).await?;
        let (assigned_lead_count, validator_hotkeys) = assignment
            .map(|a| (a.assigned_lead_ids.len(), a.validator_hotkeys))
            .unwrap_or_default();
        self.log
            .log_event(EventPayload::EpochInputs(EpochInputsPayload {
                epoch_id,
                assigned_lead_count,
                commit_count,
                validator_hotkeys,
            }))
            .await?;
        info!(epoch_id, commit_count, "validation phase closed");
        Ok(())
    }

    /// Prefetch the would-be assignment for an upcoming epoch. The
    /// cached snapshot is advisory; initialization revalidates against
    /// the log before publishing.
    pub async fn prefetch(&self, epoch_id: u64) -> Result<(), EpochError> {
        if self.cache.contains(epoch_id) {
            return Ok(());
        }
        let pending = self.store.oldest_pending(MAX_LEADS_PER_EPOCH).await?;
        let pending_count = self.store.pending_count().await?;
        let metagraph = self.registry.get_metagraph(epoch_id).await?;
        let assignment =
            build_assignment(epoch_id, &pending, pending_count, metagraph.validator_hotkeys());
        info!(
            epoch_id,
            leads = assignment.assigned_lead_ids.len(),
            "next-epoch assignment prefetched"
        );
        self.cache.insert(CachedEpoch {
            assignment,
            leads: pending,
        });
        Ok(())
    }
}

/// Parse the assignment out of an `EPOCH_INITIALIZATION` entry.
pub fn assignment_from_entry(entry: &LogEntry) -> Result<EpochAssignment, EpochError> {
    match entry.payload() {
        Ok(EventPayload::EpochInitialization(p)) => Ok(EpochAssignment {
            epoch_id: p.epoch_id,
            assigned_lead_ids: p.assigned_lead_ids,
            queue_merkle_root: p.queue_merkle_root,
            validator_hotkeys: p.validator_hotkeys,
            pending_lead_count: p.pending_lead_count,
        }),
        _ => Err(EpochError::NotInitialized(entry_epoch(entry))),
    }
}

fn entry_epoch(entry: &LogEntry) -> u64 {
    entry
        .signed_event
        .payload
        .get("epoch_id")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lg_01_chain_client::SimChainClient;
    use lg_02_registry::RegistryConfig;
    use lg_03_store::{LeadStore, MemoryStore, TransparencyLogStore};
    use lg_04_transparency::{EnclaveSigner, LocalTeeService};
    use serde_json::json;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{EventType, LeadStatus, Neuron};
    use uuid::Uuid;

    async fn fixture(pending_leads: usize) -> (EpochLifecycle, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for n in 0..pending_leads {
            store
                .insert_lead(Lead {
                    lead_id: Uuid::new_v4(),
                    miner_hotkey: "5Miner".to_string(),
                    lead_blob: json!({"n": n}),
                    lead_blob_hash: format!("bh{n}"),
                    email_hash: format!("e{n}"),
                    linkedin_combo_hash: String::new(),
                    status: LeadStatus::PendingValidation,
                    created_ts: Utc::now() + chrono::Duration::seconds(n as i64),
                    consensus_snapshot: None,
                    icp_multiplier: None,
                })
                .await
                .unwrap();
        }

        let sim = Arc::new(SimChainClient::new(0));
        sim.set_neurons(vec![Neuron {
            hotkey: "5Validator".to_string(),
            uid: 0,
            stake: 1_000.0,
            validator_trust: 0.9,
            active: true,
            validator_permit: true,
        }]);
        let registry = Arc::new(RegistryCache::new(sim, RegistryConfig::new(401)));

        let signer = EnclaveSigner::new(
            Ed25519KeyPair::from_seed([9; 32]),
            "c0de".to_string(),
            None,
            0,
        );
        let (tee, restart) = LocalTeeService::boot(signer);
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(TransparencyLog::new(
            tee,
            store.clone(),
            dir.path().join("fallback.jsonl"),
        ));
        std::mem::forget(dir);
        log.persist_entry(restart).await.unwrap();

        let lifecycle = EpochLifecycle::new(
            store.clone(),
            registry,
            log,
            Arc::new(LeadCache::new()),
        );
        (lifecycle, store)
    }

    #[tokio::test]
    async fn test_initialize_emits_single_event_and_promotes_leads() {
        let (lifecycle, store) = fixture(3).await;
        let assignment = lifecycle
            .initialize_epoch(100, CREATED_BY_MONITOR)
            .await
            .unwrap();
        assert_eq!(assignment.assigned_lead_ids.len(), 3);
        assert_eq!(assignment.validator_hotkeys, vec!["5Validator".to_string()]);

        // Leads promoted to validating.
        for id in &assignment.assigned_lead_ids {
            let lead = store.get_lead(id).await.unwrap().unwrap();
            assert_eq!(lead.status, LeadStatus::Validating);
        }

        // Second call is a no-op returning the canonical assignment.
        let again = lifecycle
            .initialize_epoch(100, CREATED_BY_MONITOR)
            .await
            .unwrap();
        assert_eq!(again, assignment);
        let inits = store
            .entries_by_type(EventType::EpochInitialization)
            .await
            .unwrap();
        assert_eq!(inits.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_materialization_marks_creator() {
        let (lifecycle, store) = fixture(1).await;
        let assignment = lifecycle.get_or_init_assignment(7).await.unwrap();
        assert_eq!(assignment.epoch_id, 7);

        let entry = store.epoch_initialization(7).await.unwrap().unwrap();
        match entry.payload().unwrap() {
            EventPayload::EpochInitialization(p) => {
                assert_eq!(p.created_by, CREATED_BY_FALLBACK)
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_end_validation_emits_end_and_inputs() {
        let (lifecycle, store) = fixture(2).await;
        lifecycle.initialize_epoch(5, CREATED_BY_MONITOR).await.unwrap();
        lifecycle.end_validation(5).await.unwrap();

        assert_eq!(
            store.entries_by_type(EventType::EpochEnd).await.unwrap().len(),
            1
        );
        let inputs = store.entries_by_type(EventType::EpochInputs).await.unwrap();
        assert_eq!(inputs.len(), 1);
        match inputs[0].payload().unwrap() {
            EventPayload::EpochInputs(p) => {
                assert_eq!(p.epoch_id, 5);
                assert_eq!(p.assigned_lead_count, 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prefetch_then_initialize_uses_cache() {
        let (lifecycle, _store) = fixture(4).await;
        lifecycle.prefetch(3).await.unwrap();
        assert!(lifecycle.cache().contains(3));

        let assignment = lifecycle
            .initialize_epoch(3, CREATED_BY_MONITOR)
            .await
            .unwrap();
        assert_eq!(assignment.assigned_lead_ids.len(), 4);
    }

    #[tokio::test]
    async fn test_epoch_leads_served_from_cache() {
        let (lifecycle, _store) = fixture(2).await;
        lifecycle.initialize_epoch(9, CREATED_BY_MONITOR).await.unwrap();
        let leads = lifecycle.epoch_leads(9).await.unwrap();
        assert_eq!(leads.len(), 2);
    }
}
