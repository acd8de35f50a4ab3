//! # Lead Submission
//!
//! Miner intake path. Ordering matters: the slot reservation comes
//! first (CAS against the rolling caps), and any later gate failure
//! releases the slot so an invalid submission never burns quota.

use std::sync::Arc;

use chrono::Utc;
use lg_03_store::{CounterStore, GatewayStore, LeadStore};
use lg_04_transparency::TransparencyLog;
use serde::{Deserialize, Serialize};
use shared_crypto::{
    canonical_json_bytes, compute_email_hash, compute_linkedin_combo_hash, sha256_hex,
};
use shared_types::{
    EventPayload, Lead, LeadStatus, RateLimitConfig, SubmissionPayload,
};
use tracing::info;
use uuid::Uuid;

use crate::errors::CommitRevealError;

/// What the miner gets back from `/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub lead_id: Uuid,
    pub email_hash: String,
    pub linkedin_combo_hash: String,
    /// Hash of the `SUBMISSION` log entry, the miner's audit anchor.
    pub event_hash: String,
}

/// Miner lead intake.
pub struct SubmissionService {
    store: Arc<dyn GatewayStore>,
    log: Arc<TransparencyLog>,
    rate_limits: RateLimitConfig,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        log: Arc<TransparencyLog>,
        rate_limits: RateLimitConfig,
    ) -> Self {
        Self {
            store,
            log,
            rate_limits,
        }
    }

    /// Ingest one lead from an authenticated miner.
    pub async fn submit(
        &self,
        miner_hotkey: &str,
        lead_blob: serde_json::Value,
    ) -> Result<SubmissionReceipt, CommitRevealError> {
        // Reserve first; a failed gate must release the slot so an
        // invalid submission never burns quota.
        self.store
            .try_reserve_slot(miner_hotkey, &self.rate_limits)
            .await?;

        let gated = self.gate(miner_hotkey, lead_blob).await;
        let lead = match gated {
            Ok(lead) => lead,
            Err(e) => {
                self.store.release_failed_slot(miner_hotkey).await?;
                return Err(e);
            }
        };

        let lead_id = lead.lead_id;
        let email_hash = lead.email_hash.clone();
        let linkedin_combo_hash = lead.linkedin_combo_hash.clone();
        let lead_blob_hash = lead.lead_blob_hash.clone();
        if let Err(e) = self.store.insert_lead(lead).await {
            self.store.release_failed_slot(miner_hotkey).await?;
            return Err(e.into());
        }

        let logged = self
            .log
            .log_event(EventPayload::Submission(SubmissionPayload {
                lead_id,
                miner_hotkey: miner_hotkey.to_string(),
                lead_blob_hash,
                email_hash: email_hash.clone(),
                linkedin_combo_hash: linkedin_combo_hash.clone(),
                nonce: Uuid::new_v4(),
            }))
            .await;
        let entry = match logged {
            Ok(entry) => entry,
            Err(e) => {
                // An unlogged lead must not exist: roll the row back so
                // the store and the public log stay consistent.
                let _ = self.store.delete_lead(&lead_id).await;
                self.store.release_failed_slot(miner_hotkey).await?;
                return Err(e.into());
            }
        };

        info!(%lead_id, miner = miner_hotkey, "lead submitted");
        Ok(SubmissionReceipt {
            lead_id,
            email_hash,
            linkedin_combo_hash,
            event_hash: entry.event_hash,
        })
    }

    /// Validate the blob and build the lead row.
    async fn gate(
        &self,
        miner_hotkey: &str,
        lead_blob: serde_json::Value,
    ) -> Result<Lead, CommitRevealError> {
        let email = lead_blob
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|e| e.contains('@') && !e.is_empty())
            .ok_or(CommitRevealError::MissingEmail)?;

        let email_hash = compute_email_hash(email);
        let linkedin_combo_hash = compute_linkedin_combo_hash(
            lead_blob
                .get("linkedin_url")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
            lead_blob
                .get("company_linkedin_url")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
        );

        // Fast duplicate check before the insert (the store's unique
        // constraint remains the final arbiter under races).
        if self
            .store
            .fingerprint_exists(&email_hash, &linkedin_combo_hash)
            .await?
        {
            return Err(CommitRevealError::DuplicateLead("fingerprint".to_string()));
        }

        let lead_blob_hash = sha256_hex(&canonical_json_bytes(&lead_blob));
        Ok(Lead {
            lead_id: Uuid::new_v4(),
            miner_hotkey: miner_hotkey.to_string(),
            lead_blob,
            lead_blob_hash,
            email_hash,
            linkedin_combo_hash,
            status: LeadStatus::PendingValidation,
            created_ts: Utc::now(),
            consensus_snapshot: None,
            icp_multiplier: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::log_fixture;
    use lg_03_store::{CounterStore, LeadStore, MemoryStore, TransparencyLogStore};
    use serde_json::json;
    use shared_types::EventType;

    fn blob(email: &str) -> serde_json::Value {
        let slug = email.split('@').next().unwrap_or("x");
        json!({
            "email": email,
            "linkedin_url": format!("https://www.linkedin.com/in/{slug}/"),
            "company_linkedin_url": "https://www.linkedin.com/company/acme/",
            "company": "Acme",
        })
    }

    async fn service() -> (SubmissionService, Arc<MemoryStore>) {
        let (log, store) = log_fixture().await;
        (
            SubmissionService::new(store.clone(), log, RateLimitConfig::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_submit_normalizes_and_logs() {
        let (service, store) = service().await;
        let receipt = service
            .submit("5Miner", blob("Alice@Example.COM"))
            .await
            .unwrap();

        // Normalized fingerprints.
        assert_eq!(
            receipt.email_hash,
            shared_crypto::sha256_hex(b"alice@example.com")
        );
        assert_eq!(
            receipt.linkedin_combo_hash,
            shared_crypto::sha256_hex(b"linkedin.com/in/alice||linkedin.com/company/acme")
        );

        let lead = store.get_lead(&receipt.lead_id).await.unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::PendingValidation);

        let events = store.entries_by_type(EventType::Submission).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_hash, receipt.event_hash);
    }

    #[tokio::test]
    async fn test_duplicate_releases_slot() {
        let (service, store) = service().await;
        service.submit("5Miner", blob("a@x.com")).await.unwrap();
        let err = service
            .submit("5Miner", blob("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitRevealError::DuplicateLead(_)));

        // Only the successful submission holds quota.
        let counters = store.get_counters("5Miner").await.unwrap();
        assert_eq!(counters.submissions, 1);
        assert_eq!(counters.slot_reservations, 1);
    }

    #[tokio::test]
    async fn test_missing_email_rejected_without_quota() {
        let (service, store) = service().await;
        let err = service
            .submit("5Miner", json!({"company": "Acme"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitRevealError::MissingEmail));
        let counters = store.get_counters("5Miner").await.unwrap();
        assert_eq!(counters.submissions, 0);
    }

    #[tokio::test]
    async fn test_cap_enforced() {
        let (service, _store) = service().await;
        for n in 0..10 {
            service
                .submit("5Miner", blob(&format!("m{n}@x.com")))
                .await
                .unwrap();
        }
        let err = service
            .submit("5Miner", blob("m11@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitRevealError::RateLimited(_)));
    }
}
