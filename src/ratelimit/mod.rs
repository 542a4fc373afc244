//! Per-client rate limiting for the public API surface.
//!
//! Counters are process-local: each instance enforces its own window. The
//! [`RateLimiter`] trait is the seam for a shared-store implementation if the
//! service is ever scaled horizontally.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Window duration for the public API: 100 requests per 10 minutes per client.
pub const WINDOW: Duration = Duration::from_secs(10 * 60);
pub const MAX_REQUESTS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Rejected; `retry_after_secs` is the time until the window resets.
    Limited { retry_after_secs: u64 },
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

pub trait RateLimiter: Send + Sync {
    /// Count one request for `client_ip` and decide whether to admit it.
    fn admit(&self, client_ip: Option<&str>) -> Decision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn admit(&self, _client_ip: Option<&str>) -> Decision {
        Decision::Allowed
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by client address.
///
/// The counter for an address resets once its window elapses; the check and
/// increment happen under one lock so concurrent requests cannot overshoot
/// the limit.
#[derive(Debug)]
pub struct WindowRateLimiter {
    window: Duration,
    max_requests: u32,
    state: Mutex<HashMap<String, Window>>,
}

impl Default for WindowRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(WINDOW, MAX_REQUESTS)
    }

    #[must_use]
    pub fn with_limits(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            state: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for WindowRateLimiter {
    fn admit(&self, client_ip: Option<&str>) -> Decision {
        // Clients without a resolvable address share one bucket.
        let key = client_ip.unwrap_or("unknown");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = state.entry(key.to_string()).or_insert_with(|| Window {
            started: Instant::now(),
            count: 0,
        });

        let elapsed = entry.started.elapsed();
        if elapsed >= self.window {
            entry.started = Instant::now();
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            Decision::Allowed
        } else {
            let retry_after_secs = self
                .window
                .checked_sub(elapsed)
                .unwrap_or_default()
                .as_secs()
                .max(1);
            Decision::Limited { retry_after_secs }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(limiter.admit(Some("1.2.3.4")), Decision::Allowed);
        assert_eq!(limiter.admit(None), Decision::Allowed);
    }

    #[test]
    fn admits_up_to_the_limit_and_rejects_the_next() {
        let limiter = WindowRateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            assert_eq!(limiter.admit(Some("1.2.3.4")), Decision::Allowed);
        }
        match limiter.admit(Some("1.2.3.4")) {
            Decision::Limited { retry_after_secs } => {
                assert!(retry_after_secs >= 1);
                assert!(retry_after_secs <= WINDOW.as_secs());
            }
            Decision::Allowed => panic!("request over the limit was admitted"),
        }
    }

    #[test]
    fn windows_are_tracked_per_address() {
        let limiter = WindowRateLimiter::with_limits(Duration::from_secs(60), 1);
        assert_eq!(limiter.admit(Some("1.1.1.1")), Decision::Allowed);
        assert_eq!(limiter.admit(Some("2.2.2.2")), Decision::Allowed);
        assert!(!limiter.admit(Some("1.1.1.1")).is_allowed());
    }

    #[test]
    fn counting_restarts_after_the_window_elapses() {
        let limiter = WindowRateLimiter::with_limits(Duration::from_millis(40), 2);
        assert!(limiter.admit(Some("1.2.3.4")).is_allowed());
        assert!(limiter.admit(Some("1.2.3.4")).is_allowed());
        assert!(!limiter.admit(Some("1.2.3.4")).is_allowed());

        std::thread::sleep(Duration::from_millis(50));

        assert!(limiter.admit(Some("1.2.3.4")).is_allowed());
        assert!(limiter.admit(Some("1.2.3.4")).is_allowed());
        assert!(!limiter.admit(Some("1.2.3.4")).is_allowed());
    }

    #[test]
    fn missing_address_shares_one_bucket() {
        let limiter = WindowRateLimiter::with_limits(Duration::from_secs(60), 1);
        assert!(limiter.admit(None).is_allowed());
        assert!(!limiter.admit(None).is_allowed());
    }
}
