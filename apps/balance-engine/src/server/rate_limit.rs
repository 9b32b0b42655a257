//! Fixed-window rate limiting for the admin API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::backend::cache::Clock;

/// Per-client fixed-window request limiter.
///
/// Windows are tracked per client key; a key's counter resets when its
/// window elapses. State is bounded by the number of distinct clients,
/// which for an admin API is small.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, WindowState>>,
}

struct WindowState {
    started_at: Instant,
    count: u32,
}

impl FixedWindowLimiter {
    /// Create a limiter allowing `max_requests` per `window` per client.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `client` and report whether it is allowed.
    pub fn check(&self, client: &str) -> bool {
        let now = self.clock.now();
        // A poisoned lock fails open rather than blocking the admin API.
        let Ok(mut windows) = self.windows.lock() else {
            return true;
        };

        let state = windows.entry(client.to_string()).or_insert(WindowState {
            started_at: now,
            count: 0,
        });

        if now.duration_since(state.started_at) >= self.window {
            state.started_at = now;
            state.count = 0;
        }

        state.count += 1;
        state.count <= self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cache::SystemClock;

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60), Arc::new(SystemClock));

        assert!(limiter.check("client"));
        assert!(limiter.check("client"));
        assert!(limiter.check("client"));
        assert!(!limiter.check("client"));
    }

    #[test]
    fn test_window_reset() {
        let clock = Arc::new(ManualClock::new());
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60), clock.clone());

        assert!(limiter.check("client"));
        assert!(!limiter.check("client"));

        clock.advance(Duration::from_secs(60));
        assert!(limiter.check("client"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60), Arc::new(SystemClock));

        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }
}
