//! Sliding-window rate limiter for authenticated admission requests, keyed
//! by caller rather than by application id.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::protocol::UserId;

pub(crate) struct AdmissionRateLimiter {
    windows: DashMap<UserId, VecDeque<Instant>>,
    window: Duration,
    max_requests: u32,
}

impl AdmissionRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Trims the caller's window to `self.window` and records this call if
    /// it is still under `max_requests`. Returns `false` once the caller has
    /// exhausted their budget for the current window.
    pub fn check(&self, user_id: UserId) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(user_id).or_default();

        while let Some(&front) = entry.front() {
            if now.duration_since(front) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() >= self.max_requests as usize {
            false
        } else {
            entry.push_back(now);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn allows_up_to_the_configured_limit_then_rejects() {
        let limiter = AdmissionRateLimiter::new(Duration::from_secs(60), 3);
        let user_id = Uuid::new_v4();

        assert!(limiter.check(user_id));
        assert!(limiter.check(user_id));
        assert!(limiter.check(user_id));
        assert!(!limiter.check(user_id));
    }

    #[test]
    fn callers_have_independent_budgets() {
        let limiter = AdmissionRateLimiter::new(Duration::from_secs(60), 1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(limiter.check(a));
        assert!(!limiter.check(a));
        assert!(limiter.check(b));
    }

    #[test]
    fn requests_outside_the_window_are_forgotten() {
        let limiter = AdmissionRateLimiter::new(Duration::from_millis(20), 1);
        let user_id = Uuid::new_v4();

        assert!(limiter.check(user_id));
        assert!(!limiter.check(user_id));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(user_id));
    }
}
