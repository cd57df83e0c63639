//! Fixed window rate limiting keyed by client fingerprint.
//!
//! Each key owns one [`RateWindow`]. The first request of a window opens it
//! with `count = 1`; later requests increment until `max_requests`, after
//! which they are denied until `reset_at` passes. Expired windows are swept
//! lazily before every lookup.
//!
//! Counters live in process memory only. A restart, or a second instance,
//! starts from zero.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Window length and request budget for one limiter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }

    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Counter state for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    /// Milliseconds since the Unix epoch.
    pub reset_at: u64,
}

impl RateWindow {
    fn open(now_ms: u64, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 1,
            reset_at: now_ms.saturating_add(policy.window_ms()),
        }
    }

    fn is_current(&self, now_ms: u64) -> bool {
        now_ms < self.reset_at
    }
}

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Milliseconds since the Unix epoch.
    pub reset_at: u64,
}

impl RateDecision {
    /// Whole seconds until the window resets, at least 1.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        let wait_ms = self.reset_at.saturating_sub(now_ms);
        wait_ms.div_ceil(1000).max(1)
    }
}

/// In-memory fixed window limiter.
///
/// The per-key read-modify-write happens under the DashMap entry lock, so
/// concurrent requests for the same key never undercount.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
}

/// Current wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request for `key` and report whether it is admitted.
    pub fn is_allowed(&self, key: &str, policy: &RateLimitPolicy) -> bool {
        self.check_at(key, policy, now_millis()).allowed
    }

    /// Requests left in the current window for `key`.
    pub fn remaining(&self, key: &str, policy: &RateLimitPolicy) -> u32 {
        self.remaining_at(key, policy, now_millis())
    }

    /// When the current window for `key` resets (epoch milliseconds).
    pub fn reset_time(&self, key: &str, policy: &RateLimitPolicy) -> u64 {
        self.reset_time_at(key, policy, now_millis())
    }

    /// Count a request and return the full decision.
    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateDecision {
        self.check_at(key, policy, now_millis())
    }

    /// [`check`](Self::check) against an explicit clock.
    pub fn check_at(&self, key: &str, policy: &RateLimitPolicy, now_ms: u64) -> RateDecision {
        self.sweep(now_ms);

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow {
                count: 0,
                reset_at: now_ms,
            });

        let allowed = if !window.is_current(now_ms) {
            *window = RateWindow::open(now_ms, policy);
            true
        } else if window.count < policy.max_requests {
            window.count += 1;
            true
        } else {
            false
        };

        RateDecision {
            allowed,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(window.count),
            reset_at: window.reset_at,
        }
    }

    /// [`is_allowed`](Self::is_allowed) against an explicit clock.
    pub fn is_allowed_at(&self, key: &str, policy: &RateLimitPolicy, now_ms: u64) -> bool {
        self.check_at(key, policy, now_ms).allowed
    }

    /// [`remaining`](Self::remaining) against an explicit clock.
    pub fn remaining_at(&self, key: &str, policy: &RateLimitPolicy, now_ms: u64) -> u32 {
        match self.windows.get(key) {
            Some(w) if w.is_current(now_ms) => policy.max_requests.saturating_sub(w.count),
            _ => policy.max_requests,
        }
    }

    /// [`reset_time`](Self::reset_time) against an explicit clock.
    pub fn reset_time_at(&self, key: &str, policy: &RateLimitPolicy, now_ms: u64) -> u64 {
        match self.windows.get(key) {
            Some(w) if w.is_current(now_ms) => w.reset_at,
            _ => now_ms.saturating_add(policy.window_ms()),
        }
    }

    /// Number of tracked client keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn sweep(&self, now_ms: u64) {
        self.windows.retain(|_, w| w.reset_at >= now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn policy(max: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(Duration::from_millis(1000), max)
    }

    #[test]
    fn test_admits_up_to_max_then_denies() {
        let limiter = RateLimiter::new();
        let p = policy(3);

        for i in 0..3 {
            assert!(limiter.is_allowed_at("client", &p, T0 + i), "request {} denied", i + 1);
        }
        assert!(!limiter.is_allowed_at("client", &p, T0 + 10));
        assert!(!limiter.is_allowed_at("client", &p, T0 + 999));
    }

    #[test]
    fn test_window_restarts_after_reset() {
        let limiter = RateLimiter::new();
        let p = policy(2);

        assert!(limiter.is_allowed_at("client", &p, T0));
        assert!(limiter.is_allowed_at("client", &p, T0 + 1));
        assert!(!limiter.is_allowed_at("client", &p, T0 + 2));

        // reset_at == T0 + 1000, so the boundary itself opens a new window
        let decision = limiter.check_at("client", &p, T0 + 1000);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_at, T0 + 2000);
    }

    #[test]
    fn test_remaining_tracks_count_and_never_underflows() {
        let limiter = RateLimiter::new();
        let p = policy(2);

        assert_eq!(limiter.remaining_at("client", &p, T0), 2);
        limiter.check_at("client", &p, T0);
        assert_eq!(limiter.remaining_at("client", &p, T0), 1);
        limiter.check_at("client", &p, T0);
        assert_eq!(limiter.remaining_at("client", &p, T0), 0);

        let denied = limiter.check_at("client", &p, T0);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(limiter.remaining_at("client", &p, T0), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let p = policy(1);

        assert!(limiter.is_allowed_at("a", &p, T0));
        assert!(!limiter.is_allowed_at("a", &p, T0));
        assert!(limiter.is_allowed_at("b", &p, T0));
    }

    #[test]
    fn test_reset_time() {
        let limiter = RateLimiter::new();
        let p = policy(5);

        assert_eq!(limiter.reset_time_at("client", &p, T0), T0 + 1000);
        limiter.check_at("client", &p, T0);
        assert_eq!(limiter.reset_time_at("client", &p, T0 + 500), T0 + 1000);
    }

    #[test]
    fn test_sweep_evicts_expired_windows() {
        let limiter = RateLimiter::new();
        let p = policy(5);

        limiter.check_at("old-1", &p, T0);
        limiter.check_at("old-2", &p, T0);
        assert_eq!(limiter.len(), 2);

        limiter.check_at("fresh", &p, T0 + 5000);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateDecision {
            allowed: false,
            limit: 1,
            remaining: 0,
            reset_at: T0 + 1500,
        };
        assert_eq!(decision.retry_after_secs(T0), 2);
        assert_eq!(decision.retry_after_secs(T0 + 1500), 1);
    }

    #[test]
    fn test_concurrent_checks_do_not_undercount() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let p = RateLimitPolicy::new(Duration::from_secs(3600), 1000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..200)
                        .filter(|_| limiter.is_allowed_at("shared", &p, T0))
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 1000);
        assert_eq!(limiter.remaining_at("shared", &p, T0), 0);
    }
}
