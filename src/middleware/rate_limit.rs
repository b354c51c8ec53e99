//! Sliding-window rate limiter for the public verification endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Returns false when the identifier has exhausted its window.
    pub async fn check(&self, identifier: &str) -> bool {
        let mut requests = self.requests.write().await;
        let now = Instant::now();
        let timestamps = requests.entry(identifier.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);
        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_are_tracked_per_identifier() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check("1.1.1.1").await);
        assert!(limiter.check("1.1.1.1").await);
        assert!(!limiter.check("1.1.1.1").await);
        assert!(limiter.check("2.2.2.2").await);
    }

    #[tokio::test]
    async fn window_expiry_frees_the_identifier() {
        let limiter = RateLimiter::new(1, 1);
        assert!(limiter.check("1.1.1.1").await);
        assert!(!limiter.check("1.1.1.1").await);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.check("1.1.1.1").await);
    }
}
