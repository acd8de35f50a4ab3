//! End-to-end protocol scenarios driven block by block.

use lg_03_store::{CounterStore, EvidenceStore, LeadStore, TransparencyLogStore};
use lg_06_commit_reveal::{CommitRevealError, RevealOutcome};
use lg_07_consensus::LeadOutcome;
use shared_crypto::sha256_hex;
use shared_types::{Decision, EventPayload, EventType, LeadStatus};

use crate::harness::{TestNet, TestNeuron};

const SALT: &str = "deadbeef";

fn start(epoch: u64) -> u64 {
    TestNet::epoch_start(epoch)
}

/// Single validator, single lead, approve all the way through.
#[tokio::test]
async fn test_happy_path_single_validator() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;

    // Warm start inside epoch 99 so the grace period has elapsed by
    // epoch 101's consensus window.
    net.observe_block(start(99)).await;

    let receipt = net
        .submit_lead("5Miner", "Alice@Example.COM", "alice", "acme")
        .await
        .unwrap();
    assert_eq!(receipt.email_hash, sha256_hex(b"alice@example.com"));
    assert_eq!(
        receipt.linkedin_combo_hash,
        sha256_hex(b"linkedin.com/in/alice||linkedin.com/company/acme")
    );

    // Epoch 100 initializes with exactly this lead.
    net.observe_block(start(100)).await;
    let init = net.store.epoch_initialization(100).await.unwrap().unwrap();
    match init.payload().unwrap() {
        EventPayload::EpochInitialization(p) => {
            assert_eq!(p.assigned_lead_ids, vec![receipt.lead_id]);
            assert_eq!(p.validator_hotkeys, vec!["5Validator".to_string()]);
        }
        other => panic!("unexpected payload {other:?}"),
    }

    // Commit during the active window.
    let evidence_id = net
        .commit_decision(
            "5Validator",
            receipt.lead_id,
            100,
            start(100) + 10,
            Decision::Approve,
            42,
            "pass",
            SALT,
        )
        .await
        .unwrap();

    // Reveal at epoch 101 block 50; eager consensus applies approve.
    let (outcome, consensus) = net
        .reveal_decision(
            "5Validator",
            evidence_id,
            100,
            start(101) + 50,
            Decision::Approve,
            42,
            "pass",
            SALT,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, RevealOutcome::Revealed { .. }));
    assert_eq!(
        consensus,
        Some(LeadOutcome::Applied {
            decision: Decision::Approve
        })
    );

    let lead = net.store.get_lead(&receipt.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::Approved);
    let snapshot = lead.consensus_snapshot.unwrap();
    assert_eq!(snapshot.approval_ratio, 1.0);
    assert_eq!(snapshot.final_rep_score, 42.0);
    assert_eq!(snapshot.primary_rejection_reason, "pass");

    let results = net
        .store
        .entries_by_type(EventType::ConsensusResult)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

/// Three validators split; stake-weighted majority denies and the
/// heaviest deny reason wins.
#[tokio::test]
async fn test_split_decision_stake_weighted() {
    let net = TestNet::new(&[
        TestNeuron::validator("5V1", 1.0, 10.0),
        TestNeuron::validator("5V2", 1.0, 5.0),
        TestNeuron::validator("5V3", 1.0, 6.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    net.observe_block(start(99)).await;

    let receipt = net
        .submit_lead("5Miner", "bob@corp.com", "bob", "corp")
        .await
        .unwrap();
    net.observe_block(start(100)).await;

    let votes = [
        ("5V1", Decision::Approve, 40u32, "pass"),
        ("5V2", Decision::Deny, 0, "email invalid"),
        ("5V3", Decision::Deny, 0, "catch-all email"),
    ];
    let mut evidence = Vec::new();
    for (validator, decision, rep, reason) in votes {
        let id = net
            .commit_decision(
                validator,
                receipt.lead_id,
                100,
                start(100) + 20,
                decision,
                rep,
                reason,
                SALT,
            )
            .await
            .unwrap();
        evidence.push((validator, id, decision, rep, reason));
    }

    for (validator, id, decision, rep, reason) in evidence {
        net.reveal_decision(validator, id, 100, start(101) + 40, decision, rep, reason, SALT)
            .await
            .unwrap();
    }

    let lead = net.store.get_lead(&receipt.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::Denied);
    let snapshot = lead.consensus_snapshot.unwrap();
    assert_eq!(snapshot.consensus_weight, 21.0);
    // 10 / 21 < 0.5.
    assert!(snapshot.approval_ratio < 0.5);
    assert_eq!(snapshot.primary_rejection_reason, "catch-all email");
    assert_eq!(snapshot.final_rep_score, 0.0);

    // Exactly one rejection charged to the miner.
    let counters = net.store.get_counters("5Miner").await.unwrap();
    assert_eq!(counters.rejections, 1);
}

/// Reveals in epoch N+2 are expired.
#[tokio::test]
async fn test_late_reveal_rejected() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    net.observe_block(start(99)).await;

    let receipt = net
        .submit_lead("5Miner", "late@x.com", "late", "xcorp")
        .await
        .unwrap();
    net.observe_block(start(100)).await;
    let evidence_id = net
        .commit_decision(
            "5Validator",
            receipt.lead_id,
            100,
            start(100) + 10,
            Decision::Approve,
            10,
            "pass",
            SALT,
        )
        .await
        .unwrap();

    let err = net
        .reveal_decision(
            "5Validator",
            evidence_id,
            100,
            start(102) + 10,
            Decision::Approve,
            10,
            "pass",
            SALT,
        )
        .await
        .unwrap_err();
    match err {
        CommitRevealError::RevealWindowClosed(msg) => assert!(msg.contains("expired"), "{msg}"),
        other => panic!("unexpected error {other:?}"),
    }
}

/// A lead with zero reveals returns to the queue and is re-assigned
/// in the next epoch.
#[tokio::test]
async fn test_zero_reveals_requeue_and_reassign() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    net.observe_block(start(99)).await;

    let receipt = net
        .submit_lead("5Miner", "quiet@x.com", "quiet", "xcorp")
        .await
        .unwrap();

    // Assigned in epoch 100, nobody commits or reveals.
    net.observe_block(start(100)).await;
    let lead = net.store.get_lead(&receipt.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::Validating);

    // Batch consensus window of epoch 101 fires for epoch 100.
    net.observe_block(start(101)).await;
    net.observe_block(start(101) + 330).await;

    let lead = net.store.get_lead(&receipt.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::PendingValidation);
    assert!(lead.consensus_snapshot.is_none());
    // Not charged as a rejection.
    assert_eq!(net.store.get_counters("5Miner").await.unwrap().rejections, 0);

    // Epoch 102 picks it up again.
    net.observe_block(start(102)).await;
    let init = net.store.epoch_initialization(102).await.unwrap().unwrap();
    match init.payload().unwrap() {
        EventPayload::EpochInitialization(p) => {
            assert_eq!(p.assigned_lead_ids, vec![receipt.lead_id]);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Deregistered miners are swept at block 357 with their evidence.
#[tokio::test]
async fn test_deregistered_miner_sweep() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Gone"),
        TestNeuron::miner("5Stays"),
    ])
    .await;
    net.observe_block(start(99)).await;

    let mut gone_leads = Vec::new();
    for n in 0..3 {
        let receipt = net
            .submit_lead("5Gone", &format!("g{n}@x.com"), &format!("g{n}"), "gonecorp")
            .await
            .unwrap();
        gone_leads.push(receipt.lead_id);
    }
    let stays = net
        .submit_lead("5Stays", "s@x.com", "stays", "stayscorp")
        .await
        .unwrap();

    // Miner deregisters; the registry snapshot for epoch 100 must
    // reflect it, so the chain updates before the epoch turns.
    net.sim.set_neurons(
        [
            TestNeuron::validator("5Validator", 1.0, 10.0),
            TestNeuron::miner("5Stays"),
        ]
        .iter()
        .enumerate()
        .map(|(i, n)| shared_types::Neuron {
            hotkey: n.hotkey.clone(),
            uid: i as u16,
            stake: n.stake,
            validator_trust: n.v_trust,
            active: true,
            validator_permit: n.validator,
        })
        .collect(),
    );

    // Sweep block of epoch 100.
    net.observe_block(start(100)).await;
    net.observe_block(start(100) + 357).await;

    for id in &gone_leads {
        assert!(net.store.get_lead(id).await.unwrap().is_none());
    }
    assert!(net.store.get_lead(&stays.lead_id).await.unwrap().is_some());

    let events = net
        .store
        .entries_by_type(EventType::DeregisteredMinerRemoval)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    match events[0].payload().unwrap() {
        EventPayload::DeregisteredMinerRemoval(p) => {
            assert_eq!(p.removals.len(), 1);
            assert_eq!(p.removals[0].miner_hotkey, "5Gone");
            assert_eq!(p.removals[0].leads_removed, 3);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Every validator sees the same ordered assignment and root.
#[tokio::test]
async fn test_assignment_identical_for_all_validators() {
    let net = TestNet::new(&[
        TestNeuron::validator("5V1", 1.0, 10.0),
        TestNeuron::validator("5V2", 1.0, 20.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    net.observe_block(start(99)).await;

    for n in 0..3 {
        net.submit_lead("5Miner", &format!("p{n}@x.com"), &format!("p{n}"), "pcorp")
            .await
            .unwrap();
    }
    net.observe_block(start(100)).await;

    // Both validators read through the same path the HTTP layer uses.
    let a = net.lifecycle.get_or_init_assignment(100).await.unwrap();
    let b = net.lifecycle.get_or_init_assignment(100).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.assigned_lead_ids.len(), 3);
    assert_ne!(a.queue_merkle_root, shared_types::UNKNOWN_QUEUE_ROOT);
}

/// Commits for unassigned leads or second commits are rejected.
#[tokio::test]
async fn test_commit_gates() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    net.observe_block(start(99)).await;
    let receipt = net
        .submit_lead("5Miner", "c@x.com", "cc", "ccorp")
        .await
        .unwrap();
    net.observe_block(start(100)).await;

    net.commit_decision(
        "5Validator",
        receipt.lead_id,
        100,
        start(100) + 5,
        Decision::Approve,
        1,
        "pass",
        SALT,
    )
    .await
    .unwrap();

    let err = net
        .commit_decision(
            "5Validator",
            receipt.lead_id,
            100,
            start(100) + 6,
            Decision::Approve,
            1,
            "pass",
            SALT,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CommitRevealError::DuplicateCommit));

    let row_count = net.store.count_for_epoch(100).await.unwrap();
    assert_eq!(row_count, 1);
}

/// Manifests verify against stored evidence.
#[tokio::test]
async fn test_manifest_round_trip() {
    let net = TestNet::new(&[
        TestNeuron::validator("5Validator", 1.0, 10.0),
        TestNeuron::miner("5Miner"),
    ])
    .await;
    net.observe_block(start(99)).await;
    let receipt = net
        .submit_lead("5Miner", "m@x.com", "mm", "mcorp")
        .await
        .unwrap();
    net.observe_block(start(100)).await;
    net.commit_decision(
        "5Validator",
        receipt.lead_id,
        100,
        start(100) + 5,
        Decision::Approve,
        2,
        "pass",
        SALT,
    )
    .await
    .unwrap();

    let rows = net
        .store
        .by_validator_for_epoch("5Validator", 100)
        .await
        .unwrap();
    let root = lg_06_commit_reveal::manifest::evidence_merkle_root(&rows).unwrap();
    let manifest = net
        .manifest
        .submit_manifest("5Validator", 100, &root)
        .await
        .unwrap();
    assert_eq!(manifest.evidence_count, 1);

    let err = net
        .manifest
        .submit_manifest("5Validator", 100, "bogus")
        .await
        .unwrap_err();
    assert!(matches!(err, CommitRevealError::ManifestMismatch));
}
