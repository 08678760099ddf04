//! Fixed-window rate limiting.
//!
//! Counters are keyed by client identifier plus route and live in an
//! explicitly-owned `RateLimiter` handed to the middleware through
//! application state. Stale windows are pruned by the shared background
//! sweeper, not by request-path bookkeeping.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use metrics::counter;

use crate::cache::Sweep;

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: DashMap<String, Window>,
}

pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: DashMap::new(),
        }
    }

    /// Count one request against the `client:route` window.
    pub fn check(&self, client: &str, route: &str) -> RateDecision {
        let bucket_key = format!("{client}:{route}");
        let now = Instant::now();

        let mut entry = self.buckets.entry(bucket_key).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return RateDecision::Limited;
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    /// Drop windows that ended before now.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let before = self.buckets.len();
        self.buckets
            .retain(|_, entry| now.duration_since(entry.started) < window);
        before - self.buckets.len()
    }
}

impl Sweep for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limiter"
    }

    fn sweep(&self) -> usize {
        self.sweep_expired()
    }
}

/// Edge middleware bounding request volume per client and route.
pub async fn enforce(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let route = request.uri().path().to_string();

    match state.rate_limiter.check(&client, &route) {
        RateDecision::Allowed { .. } => next.run(request).await,
        RateDecision::Limited => {
            counter!("vetrina_rate_limit_rejected_total").increment(1);
            ApiError::rate_limited(state.rate_limiter.retry_after_secs())
        }
    }
}

/// Client identifier: first forwarded hop when present, else the socket
/// peer address.
fn client_key(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
