use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Rolling-window request limiter keyed by client identity (network
/// address). Stale timestamps are evicted lazily on each check — no
/// background sweep.
pub struct RateLimiter {
    stamps: DashMap<String, Vec<Instant>>,
    window: Duration,
    max_requests: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            stamps: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Record a request for `identity` and return whether it is allowed.
    ///
    /// The over-limit request's own timestamp is still recorded, so a
    /// client hammering the endpoint keeps pushing its window forward.
    pub fn check(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.stamps.entry(identity.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        entry.push(now);
        let allowed = entry.len() <= self.max_requests;
        if !allowed {
            debug!(identity, count = entry.len(), "rate limit exceeded");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_within_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 5);
        for _ in 0..5 {
            assert!(limiter.check("1.2.3.4"));
        }
        // the sixth request in the window is rejected
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn identities_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
    }

    #[test]
    fn fresh_window_admits_again() {
        let limiter = RateLimiter::new(Duration::from_millis(30), 2);
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check("a"));
    }
}
