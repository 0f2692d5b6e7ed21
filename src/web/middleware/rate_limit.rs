//! Rate limiting middleware for the authentication endpoints.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    middleware::StateInformationMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use crate::config::AuthConfig;
use crate::web::error::ApiError;

/// Per-IP rate limiter using Governor.
pub type IpRateLimiter =
    RateLimiter<NotKeyed, InMemoryState, DefaultClock, StateInformationMiddleware>;

struct LimiterEntry {
    limiter: Arc<IpRateLimiter>,
    last_seen: Instant,
    blocked_until: Option<Instant>,
}

/// Allows `attempts` per `window` for each client IP.
///
/// The budget refills gradually: one attempt every `window / attempts`.
/// Attempts are either charged up front with [`check`](Self::check) or
/// only when they fail with [`record_failure`](Self::record_failure).
pub struct AttemptLimiter {
    limiters: RwLock<HashMap<String, LimiterEntry>>,
    quota: Quota,
    period: Duration,
    window: Duration,
}

impl AttemptLimiter {
    /// Create a limiter allowing `attempts` per `window`.
    pub fn new(attempts: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiters: RwLock::new(HashMap::new()),
            quota,
            period,
            window,
        }
    }

    /// Run `f` on the IP's entry, creating it when missing.
    fn with_entry<T>(&self, ip: &str, f: impl FnOnce(&mut LimiterEntry) -> T) -> T {
        let mut guard = self.limiters.write().unwrap_or_else(|e| e.into_inner());
        let entry = guard.entry(ip.to_string()).or_insert_with(|| LimiterEntry {
            limiter: Arc::new(RateLimiter::direct(self.quota).with_middleware()),
            last_seen: Instant::now(),
            blocked_until: None,
        });
        entry.last_seen = Instant::now();
        f(entry)
    }

    /// Count an attempt; returns false when the IP is over its budget.
    pub fn check(&self, ip: &str) -> bool {
        self.with_entry(ip, |entry| entry.limiter.check().is_ok())
    }

    /// Whether the IP used up its budget through failed attempts.
    pub fn is_blocked(&self, ip: &str) -> bool {
        let guard = self.limiters.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(ip)
            .and_then(|entry| entry.blocked_until)
            .is_some_and(|until| Instant::now() < until)
    }

    /// Charge a failed attempt. Once the budget is spent the IP stays
    /// blocked until the next attempt refills.
    pub fn record_failure(&self, ip: &str) {
        let period = self.period;
        self.with_entry(ip, |entry| {
            let exhausted = match entry.limiter.check() {
                Ok(snapshot) => snapshot.remaining_burst_capacity() == 0,
                Err(_) => true,
            };
            if exhausted {
                entry.blocked_until = Some(Instant::now() + period);
            }
        });
    }

    /// Drop limiters idle for longer than the window; their budget is full again.
    pub fn cleanup(&self) -> usize {
        let mut guard = self.limiters.write().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.retain(|_, entry| entry.last_seen.elapsed() < self.window);
        before - guard.len()
    }

    /// Number of tracked client IPs.
    pub fn tracked(&self) -> usize {
        self.limiters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// State for rate limiting.
pub struct RateLimitState {
    /// Failed login attempts per IP.
    pub login: AttemptLimiter,
    /// Registration attempts per IP.
    pub register: AttemptLimiter,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    pub trust_proxy: bool,
}

impl RateLimitState {
    /// Create a new rate limit state keyed by peer address.
    pub fn new(login: AttemptLimiter, register: AttemptLimiter) -> Self {
        Self {
            login,
            register,
            trust_proxy: false,
        }
    }

    /// Build the limits from authentication configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            AttemptLimiter::new(
                config.login_attempts,
                Duration::from_secs(config.login_window_secs),
            ),
            AttemptLimiter::new(
                config.register_attempts,
                Duration::from_secs(config.register_window_secs),
            ),
        )
    }

    /// Honour forwarding headers set by a reverse proxy.
    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    /// Cleanup idle entries (call periodically).
    pub fn cleanup(&self) {
        let removed = self.login.cleanup() + self.register.cleanup();
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up idle rate limiters");
        }
    }

    /// Start a background task to periodically clean up idle entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}

fn forwarded_ip(req: &Request<Body>) -> Option<String> {
    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    req.headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Extract client IP from request.
///
/// Forwarding headers are client-controlled, so they are read only when
/// `trust_proxy` is set.
pub fn get_client_ip(req: &Request<Body>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(req) {
            return ip;
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limiting middleware for the login endpoint.
///
/// Only rejected credentials (401) count against the budget.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req, state.trust_proxy);

    if state.login.is_blocked(&ip) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::too_many_requests(
            "Too many authentication attempts, please try again later",
        )
        .into_response();
    }

    let response = next.run(req).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        state.login.record_failure(&ip);
    }
    response
}

/// Rate limiting middleware for the registration endpoint.
pub async fn register_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req, state.trust_proxy);

    if !state.register.check(&ip) {
        tracing::warn!(ip = %ip, "Registration rate limit exceeded");
        return ApiError::too_many_requests(
            "Too many registration attempts, please try again later",
        )
        .into_response();
    }

    next.run(req).await
}
