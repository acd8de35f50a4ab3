//! # Enclave Signer
//!
//! The state that lives inside the enclave: the signing keypair, the
//! boot id, the monotonic sequence, the current chain tip, and the
//! buffer of events awaiting checkpointing.
//!
//! ## Append critical section
//!
//! One append covers: read the tip, build the envelope with
//! `prev_event_hash = tip`, canonicalise, hash, sign, advance the tip,
//! assign the sequence number. Callers must hold the signer exclusively
//! for the whole operation (the `LocalTeeService` wraps it in a mutex);
//! host code must never compute `prev_event_hash` on its own.

use chrono::{SecondsFormat, Utc};
use shared_crypto::{canonical_json_bytes, sha256_hex, Ed25519KeyPair, MerkleTree};
use shared_types::{
    BufferStats, CheckpointBundle, CheckpointHeader, EventPayload, LogEntry, SignedEvent,
    ZERO_HASH,
};
use uuid::Uuid;

use crate::errors::TeeError;

/// ISO-8601 UTC with microsecond precision; the only clock in the log.
fn enclave_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// In-enclave signing and chaining state.
pub struct EnclaveSigner {
    keypair: Ed25519KeyPair,
    boot_id: Uuid,
    monotonic_seq: u64,
    tip: String,
    buffer: Vec<LogEntry>,
    /// How many buffered events the last built checkpoint covered.
    /// `clear_buffer` drains exactly that many, so events appended
    /// after the build (the checkpoint event itself) survive into the
    /// next batch.
    built_len: Option<usize>,
    next_checkpoint_number: u64,
    code_hash: String,
}

impl EnclaveSigner {
    /// Create the signer for a fresh boot.
    ///
    /// `prev_tip` is the last `event_hash` the host found in the log
    /// store; the first appended event must be the `ENCLAVE_RESTART`
    /// carrying it.
    pub fn new(
        keypair: Ed25519KeyPair,
        code_hash: String,
        prev_tip: Option<String>,
        next_checkpoint_number: u64,
    ) -> Self {
        Self {
            keypair,
            boot_id: Uuid::new_v4(),
            monotonic_seq: 0,
            tip: prev_tip.unwrap_or_else(|| ZERO_HASH.to_string()),
            buffer: Vec::new(),
            built_len: None,
            next_checkpoint_number,
            code_hash,
        }
    }

    /// Hex public key of this boot's signing key.
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    /// Boot id fixed for the signer's lifetime.
    pub fn boot_id(&self) -> Uuid {
        self.boot_id
    }

    /// SHA-256 of the deployed application code, cached at boot.
    pub fn code_hash(&self) -> &str {
        &self.code_hash
    }

    /// Attestation document for this boot's key and code hash.
    pub fn attestation(&self) -> crate::attestation::AttestationDocument {
        crate::attestation::build_attestation(&self.keypair, &self.code_hash)
    }

    /// Append one event to the chain and buffer it for checkpointing.
    pub fn append_event(&mut self, payload: &EventPayload) -> LogEntry {
        let signed_event = SignedEvent {
            event_type: payload.event_type(),
            timestamp: enclave_timestamp(),
            boot_id: self.boot_id,
            monotonic_seq: self.monotonic_seq,
            prev_event_hash: self.tip.clone(),
            payload: payload.to_value(),
        };

        // to_value on a plain struct cannot fail.
        let envelope =
            serde_json::to_value(&signed_event).unwrap_or(serde_json::Value::Null);
        let canonical = canonical_json_bytes(&envelope);
        let event_hash = sha256_hex(&canonical);
        let signature = self.keypair.sign(&canonical);

        let entry = LogEntry {
            signed_event,
            event_hash: event_hash.clone(),
            enclave_pubkey: self.public_key_hex(),
            enclave_signature: signature.to_hex(),
        };

        self.tip = event_hash;
        self.monotonic_seq += 1;
        self.buffer.push(entry.clone());
        entry
    }

    /// Current chain tip.
    pub fn tip(&self) -> &str {
        &self.tip
    }

    /// Buffer statistics for the checkpoint batcher.
    pub fn buffer_stats(&self) -> BufferStats {
        BufferStats {
            buffered_events: self.buffer.len(),
            next_checkpoint_number: self.next_checkpoint_number,
        }
    }

    /// Build a signed checkpoint over the buffered events.
    ///
    /// The buffer is NOT cleared here; events stay buffered until the
    /// upload is confirmed and the host calls `clear_buffer`.
    ///
    /// An empty buffer still yields a signed checkpoint (over a single
    /// sentinel leaf) so the public cadence never shows a gap.
    pub fn build_checkpoint(&mut self) -> Result<CheckpointBundle, TeeError> {
        let events: Vec<serde_json::Value> = self
            .buffer
            .iter()
            .map(|e| serde_json::to_value(e).unwrap_or(serde_json::Value::Null))
            .collect();

        let (merkle_values, time_range) = if events.is_empty() {
            let sentinel = serde_json::json!({
                "checkpoint_number": self.next_checkpoint_number,
                "empty": true,
            });
            let ts = enclave_timestamp();
            (vec![sentinel], (ts.clone(), ts))
        } else {
            let start = self.buffer[0].signed_event.timestamp.clone();
            let end = self.buffer[self.buffer.len() - 1].signed_event.timestamp.clone();
            (events.clone(), (start, end))
        };

        let tree = MerkleTree::from_events(&merkle_values)
            .map_err(|e| TeeError::Rejected(e.to_string()))?;

        let header = CheckpointHeader {
            checkpoint_number: self.next_checkpoint_number,
            event_count: events.len(),
            merkle_root: tree.root_hex(),
            time_range_start: time_range.0,
            time_range_end: time_range.1,
        };
        let header_value =
            serde_json::to_value(&header).unwrap_or(serde_json::Value::Null);
        let signature = self.keypair.sign(&canonical_json_bytes(&header_value));

        self.built_len = Some(self.buffer.len());
        self.next_checkpoint_number += 1;
        Ok(CheckpointBundle {
            header,
            signature: signature.to_hex(),
            enclave_pubkey: self.public_key_hex(),
            events,
            tree_levels: tree.levels_hex(),
        })
    }

    /// Drop the checkpointed events after a confirmed upload. Events
    /// appended since the build stay buffered.
    pub fn clear_buffer(&mut self) -> usize {
        let n = self.built_len.take().unwrap_or(self.buffer.len());
        let n = n.min(self.buffer.len());
        self.buffer.drain(..n);
        n
    }
}
