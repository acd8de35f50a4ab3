//! # Validator Manifests
//!
//! A validator proves completion of an epoch's work by submitting the
//! Merkle root over the ordered IDs of the evidence rows it filed. The
//! gateway recomputes the root from its own rows; only a matching root
//! is stored.

use std::sync::Arc;

use chrono::Utc;
use lg_03_store::{EvidenceStore, GatewayStore, ManifestStore};
use serde_json::json;
use shared_crypto::MerkleTree;
use shared_types::{ValidationEvidence, ValidatorManifest};
use tracing::info;

use crate::errors::CommitRevealError;

/// Merkle root over a validator's evidence IDs, in stored order.
pub fn evidence_merkle_root(rows: &[ValidationEvidence]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let leaves: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| json!(r.evidence_id.to_string()))
        .collect();
    MerkleTree::from_events(&leaves).ok().map(|t| t.root_hex())
}

/// Manifest ingress and stats reads.
pub struct ManifestService {
    store: Arc<dyn GatewayStore>,
}

impl ManifestService {
    pub fn new(store: Arc<dyn GatewayStore>) -> Self {
        Self { store }
    }

    /// Accept a validator's claimed root after recomputing it locally.
    pub async fn submit_manifest(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
        claimed_root: &str,
    ) -> Result<ValidatorManifest, CommitRevealError> {
        let rows = self
            .store
            .by_validator_for_epoch(validator_hotkey, epoch_id)
            .await?;
        let computed = evidence_merkle_root(&rows);
        if computed.as_deref() != Some(claimed_root) {
            return Err(CommitRevealError::ManifestMismatch);
        }

        let manifest = ValidatorManifest {
            validator_hotkey: validator_hotkey.to_string(),
            epoch_id,
            evidence_merkle_root: claimed_root.to_string(),
            evidence_count: rows.len(),
            submitted_ts: Utc::now(),
        };
        self.store.insert_manifest(manifest.clone()).await?;
        info!(
            validator = validator_hotkey,
            epoch_id,
            evidence = manifest.evidence_count,
            "manifest accepted"
        );
        Ok(manifest)
    }

    /// All manifests filed for an epoch.
    pub async fn manifests_for_epoch(
        &self,
        epoch_id: u64,
    ) -> Result<Vec<ValidatorManifest>, CommitRevealError> {
        Ok(self.store.manifests_for_epoch(epoch_id).await?)
    }

    /// A single validator's manifest for an epoch.
    pub async fn manifest_for_validator(
        &self,
        validator_hotkey: &str,
        epoch_id: u64,
    ) -> Result<Option<ValidatorManifest>, CommitRevealError> {
        Ok(self.store.get_manifest(validator_hotkey, epoch_id).await?)
    }
}
