//! # Feature: Rate Limiting
//!
//! Sliding window limit on command invocations per user. Backed by DashMap so
//! concurrent command tasks can check without a global lock.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<DashMap<String, Vec<Instant>>>,
    max_requests: usize,
    time_window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        RateLimiter {
            requests: Arc::new(DashMap::new()),
            max_requests,
            time_window,
        }
    }

    /// Record a request for `user_id`; `false` when the window is full
    pub fn check_rate_limit(&self, user_id: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.requests.entry(user_id.to_string()).or_default();

        entry.retain(|&time| now.duration_since(time) < self.time_window);

        if entry.len() >= self.max_requests {
            false
        } else {
            entry.push(now);
            true
        }
    }

    /// Time until the oldest request in the window expires
    pub fn retry_after(&self, user_id: &str) -> Duration {
        self.requests
            .get(user_id)
            .and_then(|entry| entry.first().copied())
            .map(|oldest| self.time_window.saturating_sub(oldest.elapsed()))
            .unwrap_or(Duration::ZERO)
    }
}
