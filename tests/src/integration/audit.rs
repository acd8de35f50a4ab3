//! Auditor-view tests: everything here verifies the log the way an
//! external reader would, from the stored entries alone.

use lg_03_store::{MemoryStore, TransparencyLogStore};
use lg_04_transparency::{EnclaveSigner, LocalTeeService, TransparencyLog};
use proptest::prelude::*;
use shared_crypto::{
    canonical_json, canonical_json_bytes, sha256_hex, Ed25519KeyPair, Ed25519PublicKey,
    Ed25519Signature,
};
use shared_types::{Decision, EventType, LogEntry, ZERO_HASH};
use std::sync::Arc;

use crate::harness::{TestNet, TestNeuron};

const SALT: &str = "deadbeef";

/// Re-derive an entry's hash and check its signature, as an auditor
/// would.
fn verify_entry(entry: &LogEntry) {
    let envelope = serde_json::to_value(&entry.signed_event).unwrap();
    let canonical = canonical_json_bytes(&envelope);
    assert_eq!(
        entry.event_hash,
        sha256_hex(&canonical),
        "event hash must match canonical envelope"
    );

    let pubkey_bytes: [u8; 32] = hex::decode(&entry.enclave_pubkey)
        .unwrap()
        .try_into()
        .unwrap();
    let pubkey = Ed25519PublicKey::from_bytes(pubkey_bytes).unwrap();
    let signature = Ed25519Signature::from_hex(&entry.enclave_signature).unwrap();
    pubkey
        .verify(&canonical, &signature)
        .expect("enclave signature must verify");
}

/// Full-run audit: one unbroken chain, one initialization per epoch,
/// and commitments that verify from public data alone.
#[tokio::test]
async fn test_chain_audit_over_full_run() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    let start = TestNet::epoch_start(100);
    net.observe_block(start - TestNet::epoch_start(1)).await;

    let receipt = net
        .submit_lead("5Miner", "audit@x.com", "audit", "auditcorp")
        .await
        .unwrap();
    net.observe_block(start).await;
    let evidence_id = net
        .commit_decision(
            "5Validator",
            receipt.lead_id,
            100,
            start + 10,
            Decision::Approve,
            30,
            "pass",
            SALT,
        )
        .await
        .unwrap();
    net.reveal_decision(
        "5Validator",
        evidence_id,
        100,
        TestNet::epoch_start(101) + 20,
        Decision::Approve,
        30,
        "pass",
        SALT,
    )
    .await
    .unwrap();

    let entries = net.store.all_entries().await.unwrap();
    assert!(entries.len() >= 5, "restart, init(s), submission, commit, reveal, result");

    // The chain is unbroken in (boot_id, monotonic_seq) order.
    let mut prev_hash = ZERO_HASH.to_string();
    let mut prev_seq = None;
    for entry in &entries {
        verify_entry(entry);
        assert_eq!(entry.signed_event.prev_event_hash, prev_hash);
        if let Some(prev) = prev_seq {
            assert_eq!(entry.signed_event.monotonic_seq, prev + 1);
        }
        prev_hash = entry.event_hash.clone();
        prev_seq = Some(entry.signed_event.monotonic_seq);

        // The enclave envelope is the only timestamp carrier.
        if let Some(payload) = entry.signed_event.payload.as_object() {
            assert!(!payload.contains_key("timestamp"));
        }
    }

    // Exactly one initialization per epoch that saw evidence.
    let inits: Vec<u64> = entries
        .iter()
        .filter(|e| e.signed_event.event_type == EventType::EpochInitialization)
        .filter_map(|e| e.signed_event.payload.get("epoch_id").and_then(|v| v.as_u64()))
        .collect();
    let unique: std::collections::HashSet<u64> = inits.iter().copied().collect();
    assert_eq!(inits.len(), unique.len());
    assert!(unique.contains(&100));

    // The revealed salt re-derives the committed hashes.
    let reveal = entries
        .iter()
        .find(|e| e.signed_event.event_type == EventType::Reveal)
        .unwrap();
    let commit = entries
        .iter()
        .find(|e| e.signed_event.event_type == EventType::ValidationCommit)
        .unwrap();
    let payload = &reveal.signed_event.payload;
    let salt = payload.get("salt").unwrap().as_str().unwrap();
    let decision = payload.get("decision").unwrap().as_str().unwrap();
    let rep = payload.get("rep_score").unwrap().as_u64().unwrap();
    let reason = payload.get("rejection_reason").unwrap().as_str().unwrap();
    let commit_payload = &commit.signed_event.payload;
    assert_eq!(
        commit_payload.get("decision_hash").unwrap().as_str().unwrap(),
        sha256_hex(format!("{decision}{salt}").as_bytes())
    );
    assert_eq!(
        commit_payload.get("rep_score_hash").unwrap().as_str().unwrap(),
        sha256_hex(format!("{rep}{salt}").as_bytes())
    );
    assert_eq!(
        commit_payload
            .get("rejection_reason_hash")
            .unwrap()
            .as_str()
            .unwrap(),
        sha256_hex(format!("{reason}{salt}").as_bytes())
    );
}

/// A restart links the new boot's chain to the stored tip.
#[tokio::test]
async fn test_restart_links_chains() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();

    // First boot writes a few events and "dies".
    let old_tip = {
        let signer = EnclaveSigner::new(
            Ed25519KeyPair::from_seed([1; 32]),
            "code-a".to_string(),
            None,
            0,
        );
        let (tee, restart) = LocalTeeService::boot(signer);
        let log = TransparencyLog::new(tee, store.clone(), dir.path().join("f1.jsonl"));
        log.persist_entry(restart).await.unwrap();
        log.log_event(shared_types::EventPayload::EpochEnd(
            shared_types::EpochEndPayload {
                epoch_id: 1,
                end_block: 720,
            },
        ))
        .await
        .unwrap();
        store.latest_tip().await.unwrap().unwrap()
    };

    // Second boot fetches the tip and links to it.
    let prev_tip = store.latest_tip().await.unwrap();
    let signer = EnclaveSigner::new(
        Ed25519KeyPair::from_seed([2; 32]),
        "code-a".to_string(),
        prev_tip,
        1,
    );
    let (tee, restart) = LocalTeeService::boot(signer);
    let log = TransparencyLog::new(tee, store.clone(), dir.path().join("f2.jsonl"));
    log.persist_entry(restart.clone()).await.unwrap();

    assert_eq!(restart.signed_event.event_type, EventType::EnclaveRestart);
    assert_eq!(restart.signed_event.prev_event_hash, old_tip);

    // The next event chains off the restart.
    let next = log
        .log_event(shared_types::EventPayload::EpochEnd(
            shared_types::EpochEndPayload {
                epoch_id: 2,
                end_block: 1080,
            },
        ))
        .await
        .unwrap();
    assert_eq!(next.signed_event.prev_event_hash, restart.event_hash);

    // Boot ids differ; each boot's sequence restarts at zero.
    let entries = store.all_entries().await.unwrap();
    assert_ne!(
        entries[0].signed_event.boot_id,
        restart.signed_event.boot_id
    );
    assert_eq!(restart.signed_event.monotonic_seq, 0);
}

// Canonical serialization is a fixpoint under parse/serialize.
proptest! {
    #[test]
    fn test_canonical_json_stability(value in arb_json(3)) {
        let first = canonical_json(&value);
        let reparsed: serde_json::Value = serde_json::from_str(&first).unwrap();
        prop_assert_eq!(canonical_json(&reparsed), first);
    }
}

fn arb_json(depth: u32) -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        "[a-zA-Z0-9 @/._-]{0,20}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(depth, 32, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4).prop_map(|m| {
                serde_json::Value::Object(m.into_iter().collect())
            }),
        ]
    })
}
