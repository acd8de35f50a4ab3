//! # Deregistered-Miner Sweep
//!
//! Hygiene pass at block 357 of every epoch: leads whose miner has left
//! the metagraph are removed before the next epoch's assignment runs.
//! Dependent evidence rows go first, in batches of 100 (row-store batch
//! limits and foreign-key order), then the lead itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use lg_02_registry::RegistryCache;
use lg_03_store::{EvidenceStore, GatewayStore, LeadStore};
use lg_04_transparency::TransparencyLog;
use shared_types::{
    DeregisteredMinerRemovalPayload, EventPayload, Lead, MinerRemoval,
};
use tracing::{info, warn};

/// Evidence deletion batch size.
const EVIDENCE_BATCH_SIZE: usize = 100;

/// The sweep service.
pub struct DeregisteredSweep {
    store: Arc<dyn GatewayStore>,
    registry: Arc<RegistryCache>,
    log: Arc<TransparencyLog>,
}

impl DeregisteredSweep {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        registry: Arc<RegistryCache>,
        log: Arc<TransparencyLog>,
    ) -> Self {
        Self {
            store,
            registry,
            log,
        }
    }

    /// Run one sweep, observed at `epoch_id`.
    pub async fn run(&self, epoch_id: u64) -> anyhow::Result<()> {
        let metagraph = self.registry.get_metagraph(epoch_id).await?;

        // Group non-final leads by miner, keep only deregistered miners.
        let mut orphaned: BTreeMap<String, Vec<Lead>> = BTreeMap::new();
        for lead in self.store.nonfinal_leads().await? {
            if !metagraph.contains(&lead.miner_hotkey) {
                orphaned
                    .entry(lead.miner_hotkey.clone())
                    .or_default()
                    .push(lead);
            }
        }
        if orphaned.is_empty() {
            info!(epoch_id, "sweep found no deregistered miners");
            return Ok(());
        }

        let mut removals = Vec::new();
        let mut success = true;
        for (miner_hotkey, leads) in orphaned {
            let mut leads_removed = 0;
            let mut evidence_removed = 0;
            for lead in &leads {
                // Evidence first; the lead row is the parent.
                match self
                    .store
                    .delete_for_lead(&lead.lead_id, EVIDENCE_BATCH_SIZE)
                    .await
                {
                    Ok(n) => evidence_removed += n,
                    Err(e) => {
                        warn!(lead = %lead.lead_id, error = %e, "evidence delete failed");
                        success = false;
                        continue;
                    }
                }
                match self.store.delete_lead(&lead.lead_id).await {
                    Ok(true) => leads_removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(lead = %lead.lead_id, error = %e, "lead delete failed");
                        success = false;
                    }
                }
            }
            info!(
                miner = %miner_hotkey,
                leads_removed,
                evidence_removed,
                "deregistered miner swept"
            );
            removals.push(MinerRemoval {
                miner_hotkey,
                leads_removed,
                evidence_removed,
            });
        }

        self.log
            .log_event(EventPayload::DeregisteredMinerRemoval(
                DeregisteredMinerRemovalPayload {
                    epoch_id,
                    removals,
                    success,
                },
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lg_01_chain_client::SimChainClient;
    use lg_02_registry::RegistryConfig;
    use lg_03_store::{EvidenceStore, LeadStore, MemoryStore, TransparencyLogStore};
    use lg_04_transparency::{EnclaveSigner, LocalTeeService};
    use serde_json::json;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{EventType, LeadStatus, Neuron, ValidationEvidence};
    use uuid::Uuid;

    async fn insert_lead(store: &MemoryStore, miner: &str, n: u8) -> Uuid {
        let lead_id = Uuid::new_v4();
        store
            .insert_lead(Lead {
                lead_id,
                miner_hotkey: miner.to_string(),
                lead_blob: json!({}),
                lead_blob_hash: String::new(),
                email_hash: format!("{miner}-e{n}"),
                linkedin_combo_hash: String::new(),
                status: LeadStatus::PendingValidation,
                created_ts: Utc::now(),
                consensus_snapshot: None,
                icp_multiplier: None,
            })
            .await
            .unwrap();
        lead_id
    }

    #[tokio::test]
    async fn test_sweep_removes_orphaned_leads() {
        let store = Arc::new(MemoryStore::new());

        // Miner M submits 3 leads, then deregisters. One lead carries an
        // evidence row.
        let mut ids = Vec::new();
        for n in 0..3 {
            ids.push(insert_lead(&store, "5Gone", n).await);
        }
        store
            .insert_commit(ValidationEvidence {
                evidence_id: Uuid::new_v4(),
                validator_hotkey: "5Validator".to_string(),
                lead_id: ids[0],
                epoch_id: 100,
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
            })
            .await
            .unwrap();

        // A still-registered miner keeps its lead.
        let kept = insert_lead(&store, "5Stays", 9).await;

        let sim = Arc::new(SimChainClient::new(0));
        sim.set_neurons(vec![Neuron {
            hotkey: "5Stays".to_string(),
            uid: 0,
            stake: 1.0,
            validator_trust: 0.0,
            active: true,
            validator_permit: false,
        }]);
        let registry = Arc::new(RegistryCache::new(sim, RegistryConfig::new(401)));

        let signer = EnclaveSigner::new(
            Ed25519KeyPair::from_seed([13; 32]),
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

        let sweep = DeregisteredSweep::new(store.clone(), registry, log);
        sweep.run(101).await.unwrap();

        for id in &ids {
            assert!(store.get_lead(id).await.unwrap().is_none());
        }
        assert!(store.get_lead(&kept).await.unwrap().is_some());

        let events = store
            .entries_by_type(EventType::DeregisteredMinerRemoval)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        match events[0].payload().unwrap() {
            EventPayload::DeregisteredMinerRemoval(p) => {
                assert!(p.success);
                assert_eq!(p.removals.len(), 1);
                assert_eq!(p.removals[0].miner_hotkey, "5Gone");
                assert_eq!(p.removals[0].leads_removed, 3);
                assert_eq!(p.removals[0].evidence_removed, 1);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
