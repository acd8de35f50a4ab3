//! # Permanent Storage
//!
//! Write-once blob uploads with confirmation polling. Checkpoint batches
//! are gzip-compressed before upload; each confirmed upload yields an
//! immutable transaction id recorded in the `ARWEAVE_CHECKPOINT` event.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::errors::UploadError;

/// Upload retry attempts before the batcher gives up for this cadence.
pub const UPLOAD_ATTEMPTS: u32 = 3;

/// Confirmation polling interval.
pub const CONFIRM_POLL_SECS: u64 = 300;

/// Hard ceiling on confirmation waiting.
pub const CONFIRM_CEILING_SECS: u64 = 600;

/// Write-once blob storage.
#[async_trait]
pub trait PermanentStore: Send + Sync {
    /// Upload a blob; returns the storage transaction id.
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<String, UploadError>;

    /// Whether a transaction has been confirmed by the storage network.
    async fn is_confirmed(&self, tx_id: &str) -> Result<bool, UploadError>;
}

/// gzip-compress a checkpoint event batch.
pub fn compress_events(events: &[serde_json::Value]) -> Result<Vec<u8>, UploadError> {
    let body = serde_json::to_vec(events)
        .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&body)
        .map_err(|e| UploadError::Request(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| UploadError::Request(e.to_string()))
}

/// Upload with bounded retries and exponential backoff, then poll for
/// confirmation up to the ceiling. Returns the confirmed tx id.
pub async fn upload_with_confirmation(
    store: &Arc<dyn PermanentStore>,
    data: Vec<u8>,
    content_type: &str,
) -> Result<String, UploadError> {
    let mut last = UploadError::Request("no attempts made".to_string());
    for attempt in 1..=UPLOAD_ATTEMPTS {
        match store.upload(data.clone(), content_type).await {
            Ok(tx_id) => {
                info!(tx_id = %tx_id, attempt, "checkpoint uploaded, polling confirmation");
                return poll_confirmation(store, tx_id).await;
            }
            Err(e) => {
                warn!(attempt, error = %e, "permanent-storage upload failed");
                last = e;
                if attempt < UPLOAD_ATTEMPTS {
                    tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                }
            }
        }
    }
    Err(last)
}

async fn poll_confirmation(
    store: &Arc<dyn PermanentStore>,
    tx_id: String,
) -> Result<String, UploadError> {
    let mut waited = 0u64;
    loop {
        if store.is_confirmed(&tx_id).await? {
            return Ok(tx_id);
        }
        if waited >= CONFIRM_CEILING_SECS {
            return Err(UploadError::Unconfirmed(CONFIRM_CEILING_SECS));
        }
        let step = CONFIRM_POLL_SECS.min(CONFIRM_CEILING_SECS - waited);
        tokio::time::sleep(Duration::from_secs(step)).await;
        waited += step;
    }
}

/// HTTP client against an Arweave-style upload gateway.
pub struct ArweaveClient {
    base_url: String,
    http: reqwest::Client,
}

impl ArweaveClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PermanentStore for ArweaveClient {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<String, UploadError> {
        let response = self
            .http
            .post(format!("{}/tx", self.base_url))
            .header("content-type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| UploadError::MalformedResponse("missing tx id".to_string()))
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<bool, UploadError> {
        let response = self
            .http
            .get(format!("{}/tx/{}/status", self.base_url, tx_id))
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        match response.status().as_u16() {
            200 => Ok(true),
            // Accepted but not yet mined.
            202 => Ok(false),
            status => Err(UploadError::Status(status)),
        }
    }
}

/// In-memory permanent store for the test suite.
#[derive(Default)]
pub struct MockPermanentStore {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    fail_uploads: Mutex<u32>,
    confirm_after_polls: Mutex<u32>,
}

impl MockPermanentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` upload calls.
    pub fn fail_next_uploads(&self, n: u32) {
        *self.fail_uploads.lock() = n;
    }

    /// Require `n` confirmation polls before reporting confirmed.
    pub fn confirm_after_polls(&self, n: u32) {
        *self.confirm_after_polls.lock() = n;
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }

    pub fn uploaded_bytes(&self, tx_id: &str) -> Option<Vec<u8>> {
        self.uploads
            .lock()
            .iter()
            .find(|(id, _)| id == tx_id)
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl PermanentStore for MockPermanentStore {
    async fn upload(&self, data: Vec<u8>, _content_type: &str) -> Result<String, UploadError> {
        let mut failures = self.fail_uploads.lock();
        if *failures > 0 {
            *failures -= 1;
            return Err(UploadError::Status(503));
        }
        drop(failures);

        let mut uploads = self.uploads.lock();
        let tx_id = format!("mock-tx-{}", uploads.len());
        uploads.push((tx_id.clone(), data));
        Ok(tx_id)
    }

    async fn is_confirmed(&self, _tx_id: &str) -> Result<bool, UploadError> {
        let mut remaining = self.confirm_after_polls.lock();
        if *remaining > 0 {
            *remaining -= 1;
            Ok(false)
        } else {
            Ok(true)
        }
    }
}
