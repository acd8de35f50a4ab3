//! # Priority Middleware
//!
//! Validator requests bypass any concurrency gate; miner requests share
//! a bounded semaphore. Near epoch boundaries miners burst submissions
//! exactly when validators must land their reveals, and a reveal that
//! misses block 328 is lost for good; the asymmetry is deliberate.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tokio::sync::Semaphore;
use tower::{Layer, Service};
use tracing::debug;

/// Default cap on concurrent miner requests.
pub const DEFAULT_MAX_CONCURRENT_MINERS: usize = 20;

/// Paths that get priority treatment (validator traffic).
fn is_validator_path(path: &str) -> bool {
    path.starts_with("/epoch/")
        || path == "/validate"
        || path == "/reveal"
        || path == "/manifest"
}

/// Paths throttled by the miner semaphore.
fn is_miner_path(path: &str) -> bool {
    path == "/submit"
}

/// Priority layer holding the shared miner semaphore.
#[derive(Clone)]
pub struct PriorityLayer {
    miner_semaphore: Arc<Semaphore>,
}

impl PriorityLayer {
    pub fn new(max_concurrent_miners: usize) -> Self {
        Self {
            miner_semaphore: Arc::new(Semaphore::new(max_concurrent_miners)),
        }
    }
}

impl Default for PriorityLayer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_MINERS)
    }
}

impl<S> Layer<S> for PriorityLayer {
    type Service = PriorityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PriorityService {
            inner,
            miner_semaphore: Arc::clone(&self.miner_semaphore),
        }
    }
}

/// The priority service wrapping the router.
#[derive(Clone)]
pub struct PriorityService<S> {
    inner: S,
    miner_semaphore: Arc<Semaphore>,
}

impl<S> Service<Request<Body>> for PriorityService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<S::Response, S::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let path = request.uri().path().to_string();
        let semaphore = Arc::clone(&self.miner_semaphore);

        // Take the ready service; leave a clone behind for the next call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if is_miner_path(&path) && !is_validator_path(&path) {
                if semaphore.available_permits() == 0 {
                    debug!(%path, "miner request waiting for a slot");
                }
                // Semaphore is never closed; hold the permit for the
                // whole request.
                let _permit = semaphore.acquire_owned().await.ok();
                inner.call(request).await
            } else {
                // Validators (and public reads) go straight through.
                inner.call(request).await
            }
        })
    }
}
