//! # Enclave Boundary
//!
//! The narrow RPC surface the host sees. On Nitro deployments these
//! calls cross a VM-to-host socket; the in-process adapter here runs the
//! signer behind a mutex with identical semantics, so the rest of the
//! gateway is oblivious to where the enclave actually lives.
//!
//! The enclave never exposes a generic `sign(bytes)`; every signature it
//! produces is over a structure it built itself.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{BufferStats, CheckpointBundle, EnclaveRestartPayload, EventPayload, LogEntry};

use crate::attestation::AttestationDocument;
use crate::errors::TeeError;
use crate::signer::EnclaveSigner;

/// The enclave RPC surface.
#[async_trait]
pub trait TeeService: Send + Sync {
    /// Append one event to the hash chain; returns the signed entry.
    async fn append_event(&self, payload: EventPayload) -> Result<LogEntry, TeeError>;

    /// Hex public key of the current boot.
    async fn get_public_key(&self) -> Result<String, TeeError>;

    /// Attestation document binding the key to the code hash.
    async fn get_attestation(&self) -> Result<AttestationDocument, TeeError>;

    /// Buffer statistics for the checkpoint batcher.
    async fn get_buffer_stats(&self) -> Result<BufferStats, TeeError>;

    /// Build (and sign) a checkpoint over the buffered events.
    async fn build_checkpoint(&self) -> Result<CheckpointBundle, TeeError>;

    /// Drop the buffered events after a confirmed upload. Returns the
    /// number dropped.
    async fn clear_buffer(&self) -> Result<usize, TeeError>;
}

/// In-process enclave adapter.
pub struct LocalTeeService {
    signer: Mutex<EnclaveSigner>,
    attestation: AttestationDocument,
}

impl LocalTeeService {
    /// Boot the enclave: cache the attestation, emit the
    /// `ENCLAVE_RESTART` event linking this boot to the signer's seeded
    /// tip, and wrap the signer for concurrent use.
    ///
    /// The returned restart entry MUST be persisted before any other
    /// event is logged.
    pub fn boot(mut signer: EnclaveSigner) -> (Arc<Self>, LogEntry) {
        let attestation = signer.attestation();
        let previous_boot_tip = match signer.tip() {
            shared_types::ZERO_HASH => None,
            tip => Some(tip.to_string()),
        };
        let restart = signer.append_event(&EventPayload::EnclaveRestart(EnclaveRestartPayload {
            previous_boot_tip,
            code_hash: signer.code_hash().to_string(),
        }));
        (
            Arc::new(Self {
                signer: Mutex::new(signer),
                attestation,
            }),
            restart,
        )
    }
}

#[async_trait]
impl TeeService for LocalTeeService {
    async fn append_event(&self, payload: EventPayload) -> Result<LogEntry, TeeError> {
        Ok(self.signer.lock().append_event(&payload))
    }

    async fn get_public_key(&self) -> Result<String, TeeError> {
        Ok(self.signer.lock().public_key_hex())
    }

    async fn get_attestation(&self) -> Result<AttestationDocument, TeeError> {
        Ok(self.attestation.clone())
    }

    async fn get_buffer_stats(&self) -> Result<BufferStats, TeeError> {
        Ok(self.signer.lock().buffer_stats())
    }

    async fn build_checkpoint(&self) -> Result<CheckpointBundle, TeeError> {
        self.signer.lock().build_checkpoint()
    }

    async fn clear_buffer(&self) -> Result<usize, TeeError> {
        Ok(self.signer.lock().clear_buffer())
    }
}
