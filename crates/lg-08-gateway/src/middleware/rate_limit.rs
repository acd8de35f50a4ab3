//! # Per-IP Rate Limiting
//!
//! Token-bucket limiting in front of every endpoint, keyed by client
//! IP. Separate from the per-miner submission caps, which are protocol
//! accounting; this layer is plain DoS protection for the listener.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tower::{Layer, Service};
use tracing::debug;

use crate::error::ApiError;

/// Limits applied to each client IP.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            burst_size: 100,
        }
    }
}

struct IpBucket {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    last_access: Instant,
}

impl IpBucket {
    fn new(config: &RateLimitConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second)
            .unwrap_or(NonZeroU32::new(50).expect("nonzero literal"));
        let burst = NonZeroU32::new(config.burst_size)
            .unwrap_or(NonZeroU32::new(100).expect("nonzero literal"));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rps).allow_burst(burst)),
            last_access: Instant::now(),
        }
    }
}

/// Shared per-IP bucket table.
pub struct RateLimitState {
    buckets: DashMap<IpAddr, IpBucket>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Whether a request from `ip` is allowed right now.
    pub fn check(&self, ip: IpAddr) -> bool {
        if !self.config.enabled {
            return true;
        }
        let mut bucket = self.buckets.entry(ip).or_insert_with(|| {
            debug!(ip = %ip, "creating rate limit bucket");
            IpBucket::new(&self.config)
        });
        bucket.last_access = Instant::now();
        bucket.limiter.check().is_ok()
    }

    /// Drop buckets idle longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_access) <= max_age);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limit layer.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(config)),
        }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// The rate limit service wrapping the router.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        let allowed = self.state.check(ip);

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if !allowed {
                debug!(ip = %ip, "request rate limited");
                return Ok(ApiError::rate_limited("too many requests").into_response());
            }
            inner.call(request).await
        })
    }
}
