//! Shared fixtures for the service tests.

use std::sync::Arc;

use lg_03_store::MemoryStore;
use lg_04_transparency::{EnclaveSigner, LocalTeeService, TransparencyLog};
use shared_crypto::Ed25519KeyPair;

/// A booted transparency log over a fresh in-memory store, restart
/// event already persisted.
pub async fn log_fixture() -> (Arc<TransparencyLog>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let signer = EnclaveSigner::new(
        Ed25519KeyPair::from_seed([21; 32]),
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
    (log, store)
}
