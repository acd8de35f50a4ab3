//! # Transparency Log Writer
//!
//! Host-side composition of the enclave with the persistent log store.
//! Every state-changing operation in the gateway funnels through
//! `log_event`: the enclave signs and chains the entry, the store
//! persists it, and enclave outages fall back to a durable local file so
//! no event is silently dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lg_03_store::{StoreError, TransparencyLogStore};
use shared_types::{EventPayload, LogEntry};
use tracing::{error, warn};

use crate::errors::TeeError;
use crate::service::TeeService;
use crate::ENCLAVE_RPC_TIMEOUT_SECS;

/// The gateway's single write path into the transparency log.
pub struct TransparencyLog {
    tee: Arc<dyn TeeService>,
    store: Arc<dyn TransparencyLogStore>,
    /// Durable fallback for entries the enclave signed but the caller
    /// could not reach the enclave or store for.
    fallback_path: PathBuf,
}

impl TransparencyLog {
    pub fn new(
        tee: Arc<dyn TeeService>,
        store: Arc<dyn TransparencyLogStore>,
        fallback_path: PathBuf,
    ) -> Self {
        Self {
            tee,
            store,
            fallback_path,
        }
    }

    /// Sign, chain, and persist one event.
    ///
    /// Store-level uniqueness violations (`NonceReplayed`,
    /// `DuplicateEpochInitialization`) propagate to the caller, which
    /// decides whether they are races to resolve or real errors.
    pub async fn log_event(&self, payload: EventPayload) -> Result<LogEntry, TeeError> {
        let entry = match tokio::time::timeout(
            Duration::from_secs(ENCLAVE_RPC_TIMEOUT_SECS),
            self.tee.append_event(payload),
        )
        .await
        {
            Ok(Ok(entry)) => entry,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                error!(
                    timeout_secs = ENCLAVE_RPC_TIMEOUT_SECS,
                    "CRITICAL: enclave append timed out"
                );
                return Err(TeeError::RpcTimeout(ENCLAVE_RPC_TIMEOUT_SECS));
            }
        };

        match self.store.append_entry(entry.clone()).await {
            Ok(()) => Ok(entry),
            Err(
                e @ (StoreError::NonceReplayed | StoreError::DuplicateEpochInitialization(_)),
            ) => Err(TeeError::Store(e)),
            Err(e) => {
                // The entry is already part of the signed chain; losing it
                // would leave an audit gap, so keep a durable copy.
                warn!(error = %e, "log store append failed, writing durable fallback");
                self.write_fallback(&entry).await?;
                Ok(entry)
            }
        }
    }

    /// Persist an already-signed entry (the boot restart event).
    pub async fn persist_entry(&self, entry: LogEntry) -> Result<(), TeeError> {
        match self.store.append_entry(entry.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "restart entry persist failed, writing durable fallback");
                self.write_fallback(&entry).await
            }
        }
    }

    /// The persistent store, for readers (fallback materialization,
    /// audits, stats).
    pub fn store(&self) -> &Arc<dyn TransparencyLogStore> {
        &self.store
    }

    /// The enclave service, for checkpoint operations.
    pub fn tee(&self) -> &Arc<dyn TeeService> {
        &self.tee
    }

    async fn write_fallback(&self, entry: &LogEntry) -> Result<(), TeeError> {
        let line = serde_json::to_string(entry)
            .map_err(|e| TeeError::FallbackWrite(e.to_string()))?;
        let mut content = line;
        content.push('\n');

        let existing = tokio::fs::read_to_string(&self.fallback_path)
            .await
            .unwrap_or_default();
        tokio::fs::write(&self.fallback_path, existing + &content)
            .await
            .map_err(|e| TeeError::FallbackWrite(e.to_string()))?;
        error!(
            path = %self.fallback_path.display(),
            event_hash = %entry.event_hash,
            "CRITICAL: log entry written to durable fallback, operator action required"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LocalTeeService;
    use crate::signer::EnclaveSigner;
    use lg_03_store::MemoryStore;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{EpochEndPayload, EventType};

    fn fixture() -> (TransparencyLog, Arc<MemoryStore>, LogEntry) {
        let store = Arc::new(MemoryStore::new());
        let signer = EnclaveSigner::new(
            Ed25519KeyPair::from_seed([8; 32]),
            "c0de".to_string(),
            None,
            0,
        );
        let (tee, restart) = LocalTeeService::boot(signer);
        let dir = tempfile::tempdir().unwrap();
        let log = TransparencyLog::new(
            tee,
            store.clone(),
            dir.path().join("fallback.jsonl"),
        );
        // Leak the tempdir so the path stays valid for the test duration.
        std::mem::forget(dir);
        (log, store, restart)
    }

    #[tokio::test]
    async fn test_log_event_persists_to_store() {
        let (log, store, restart) = fixture();
        log.persist_entry(restart.clone()).await.unwrap();

        let entry = log
            .log_event(EventPayload::EpochEnd(EpochEndPayload {
                epoch_id: 4,
                end_block: 1800,
            }))
            .await
            .unwrap();

        assert_eq!(store.entry_count().await.unwrap(), 2);
        assert_eq!(store.latest_tip().await.unwrap(), Some(entry.event_hash.clone()));
        assert_eq!(entry.signed_event.prev_event_hash, restart.event_hash);
        assert_eq!(entry.signed_event.event_type, EventType::EpochEnd);
    }

    #[tokio::test]
    async fn test_unique_violation_propagates() {
        let (log, _store, restart) = fixture();
        log.persist_entry(restart).await.unwrap();

        let payload = |epoch_id| {
            EventPayload::EpochInitialization(shared_types::EpochInitializationPayload {
                epoch_id,
                assigned_lead_ids: vec![],
                queue_merkle_root: "unknown".to_string(),
                validator_hotkeys: vec![],
                pending_lead_count: 0,
                created_by: "epoch_monitor".to_string(),
            })
        };
        log.log_event(payload(10)).await.unwrap();
        let err = log.log_event(payload(10)).await.unwrap_err();
        assert!(matches!(
            err,
            TeeError::Store(StoreError::DuplicateEpochInitialization(10))
        ));
    }
}
