//! Sliding-window rate limiting
//!
//! Each client keeps a queue of admission timestamps covering the trailing
//! window. A request is admitted while fewer than `max_requests` timestamps
//! remain after evicting the expired ones. Rejected attempts are not recorded.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;

use crate::error::AppError;
use crate::state::AppState;

/// Admission checks between two idle-client evictions
pub const IDLE_EVICTION_INTERVAL: u64 = 1024;

/// Per-client sliding-window limiter
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and record a request for `client_id` at the current instant
    pub fn is_allowed(&self, client_id: &str) -> bool {
        self.is_allowed_at(client_id, Instant::now())
    }

    /// Check and record a request for `client_id` at `now`.
    ///
    /// A timestamp exactly `window` old is already outside the window.
    pub fn is_allowed_at(&self, client_id: &str, now: Instant) -> bool {
        let cutoff = now.checked_sub(self.window);
        let mut clients = self.clients.lock();

        if self.checks.fetch_add(1, Ordering::Relaxed) % IDLE_EVICTION_INTERVAL
            == IDLE_EVICTION_INTERVAL - 1
        {
            evict_idle(&mut clients, cutoff);
        }

        let timestamps = clients.entry(client_id.to_string()).or_default();
        if let Some(cutoff) = cutoff {
            while timestamps.front().is_some_and(|ts| *ts <= cutoff) {
                timestamps.pop_front();
            }
        }

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Drop every client whose whole window has expired at `now`.
    ///
    /// Returns the number of clients removed.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock();
        evict_idle(&mut clients, now.checked_sub(self.window))
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

fn evict_idle(clients: &mut HashMap<String, VecDeque<Instant>>, cutoff: Option<Instant>) -> usize {
    let before = clients.len();
    clients.retain(|_, timestamps| match (timestamps.back(), cutoff) {
        (None, _) => false,
        (Some(newest), Some(cutoff)) => *newest > cutoff,
        (Some(_), None) => true,
    });
    let removed = before - clients.len();
    if removed > 0 {
        tracing::debug!(removed = removed, "Evicted idle rate limit windows");
    }
    removed
}

/// Client key for a request: the peer IP, or `"unknown"` when unavailable
pub fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients over their request budget
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request);
    let limiter = state.rate_limiter();

    if limiter.is_allowed(&client) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
    Err(AppError::RateLimited {
        max_requests: limiter.max_requests(),
        window_secs: limiter.window().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.is_allowed_at("c1", start));
        assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(1)));
        assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(2)));
        assert!(!limiter.is_allowed_at("c1", start + Duration::from_secs(3)));
    }

    #[test]
    fn test_window_elapses() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(i)));
        }
        assert!(!limiter.is_allowed_at("c1", start + Duration::from_secs(30)));

        // Every earlier admission is now at least 60s old
        assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(62)));
    }

    #[test]
    fn test_boundary_timestamp_is_evicted() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.is_allowed_at("c1", start));
        assert!(!limiter.is_allowed_at("c1", start + Duration::from_millis(59_999)));
        assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.is_allowed_at("c1", start));
        assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(5)));
        for s in 6..10 {
            assert!(!limiter.is_allowed_at("c1", start + Duration::from_secs(s)));
        }
        // Only the first admission has expired; the rejected attempts left no trace
        assert!(limiter.is_allowed_at("c1", start + Duration::from_secs(10)));
        assert!(!limiter.is_allowed_at("c1", start + Duration::from_secs(11)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.is_allowed_at("a", now));
        assert!(!limiter.is_allowed_at("a", now));
        assert!(limiter.is_allowed_at("b", now));
    }

    #[test]
    fn test_evict_idle() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        limiter.is_allowed_at("old", start);
        limiter.is_allowed_at("fresh", start + Duration::from_secs(50));
        assert_eq!(limiter.tracked_clients(), 2);

        let removed = limiter.evict_idle_at(start + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_concurrent_checks_respect_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(50, Duration::from_secs(3600)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..20).filter(|_| limiter.is_allowed("shared")).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}
