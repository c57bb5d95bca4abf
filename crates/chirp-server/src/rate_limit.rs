//! Per-client-IP token bucket rate limiting for the HTTP API.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::ServiceError;

/// Sustained rate and burst size applied to every client IP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    pub per_sec: f64,
    pub burst: f64,
}

impl RateLimitPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            per_sec: config.rate_limit_per_sec,
            burst: config.rate_limit_burst.max(1.0),
        }
    }

    /// Time until a drained bucket holding `tokens` can pay for one request.
    fn wait_for_token(&self, tokens: f64) -> Duration {
        Duration::from_secs_f64(((1.0 - tokens) / self.per_sec).max(0.0))
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

impl Bucket {
    fn full(policy: &RateLimitPolicy, now: Instant) -> Self {
        Self {
            tokens: policy.burst,
            last_seen: now,
        }
    }

    /// Refill for the time since the last request, then spend one token.
    /// On refusal, returns how long the client should wait.
    fn admit(&mut self, policy: &RateLimitPolicy, now: Instant) -> Result<(), Duration> {
        let idle = now.saturating_duration_since(self.last_seen).as_secs_f64();
        self.last_seen = now;
        self.tokens = (self.tokens + idle * policy.per_sec).min(policy.burst);

        if self.tokens < 1.0 {
            return Err(policy.wait_for_token(self.tokens));
        }
        self.tokens -= 1.0;
        Ok(())
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, Bucket>>>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            policy,
        }
    }

    /// Charge one request to `ip`. `Err` carries the suggested retry delay.
    pub async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert_with(|| Bucket::full(&self.policy, now))
            .admit(&self.policy, now)
    }

    /// Drop buckets idle for longer than `max_idle`. Returns how many went.
    pub async fn purge_stale(&self, max_idle: Duration) -> usize {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) < max_idle);
        before - buckets.len()
    }

    /// Purge idle buckets every `every`, forever.
    pub fn spawn_purge_task(&self, every: Duration, max_idle: Duration) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = limiter.purge_stale(max_idle).await;
                if removed > 0 {
                    debug!(removed, "Purged idle rate limit buckets");
                }
            }
        });
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ServiceError> {
    if let Some(ip) = extract_client_ip(&req) {
        if let Err(wait) = limiter.check(ip).await {
            warn!(
                ip = %ip,
                path = %req.uri().path(),
                retry_after_ms = wait.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Err(ServiceError::RateLimited {
                retry_after_secs: wait.as_secs_f64().ceil().max(1.0) as u64,
            });
        }
    }

    Ok(next.run(req).await)
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    let header_ip = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
}
