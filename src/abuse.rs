//! Anti-abuse middleware for the submission endpoint.
//!
//! Pick sheets are anonymous, so the only spam lever is pacing: a windowed
//! rate limit per client key at the HTTP boundary. The scoring and lock
//! core never sees any of this.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Rate limiter state
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Map of client key to (request count, window start)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    /// Maximum requests per window
    max_requests: u32,
    /// Time window duration
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(60)) // 1 submission per minute
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Check if a request should be allowed
    /// Returns true if allowed, false if rate limited
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                // Check if we're in a new window
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Clean up old entries (call periodically)
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }
}

/// Anti-abuse configuration
#[derive(Debug, Clone)]
pub struct AbuseConfig {
    /// Rate limiter (None = disabled)
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

impl AbuseConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let rate_limit_enabled = std::env::var("SUBMIT_RATE_LIMIT")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limiter = if rate_limit_enabled {
            let max_requests = std::env::var("SUBMIT_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);

            let window_secs = std::env::var("SUBMIT_RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            Some(RateLimiter::new(
                max_requests,
                Duration::from_secs(window_secs),
            ))
        } else {
            None
        };

        tracing::info!(rate_limit_enabled, "Anti-abuse config loaded");

        Self { rate_limiter }
    }
}

/// Extract the rate-limit key: the first hop of X-Forwarded-For.
/// Returns None if no forwarded address is present (rate limiting skipped;
/// requests that never crossed the proxy have no usable client identity)
fn get_rate_limit_key(request: &Request<Body>) -> Option<String> {
    let forwarded = request.headers().get("x-forwarded-for")?;
    let value = forwarded.to_str().ok()?;
    let first_hop = value.split(',').next()?.trim();
    if first_hop.is_empty() {
        return None;
    }
    Some(format!("ip:{}", first_hop))
}

/// Build a 429 Too Many Requests response
fn rate_limited() -> Response<Body> {
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::RETRY_AFTER, "60")
        .body(Body::from(
            "Please wait before submitting again. This helps prevent spam.",
        ))
        .unwrap()
}

/// Middleware applying the submission rate limit
pub async fn submission_limit_middleware(
    State(config): State<Arc<AbuseConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if let Some(ref rate_limiter) = config.rate_limiter {
        if let Some(key) = get_rate_limit_key(&request) {
            if !rate_limiter.check(&key).await {
                tracing::warn!(key, "Rate limited submission attempt");
                return rate_limited();
            }
        }
    }

    next.run(request).await
}
