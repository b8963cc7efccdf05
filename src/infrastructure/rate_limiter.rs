//! Fixed-window rate limiting per client
//!
//! Each client gets `limit` requests per window. The window starts with the
//! client's first request and resets once it is strictly older than the
//! window length. Rejected requests still count.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::ports::outbound::ClockPort;
use crate::infrastructure::config::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window_start: DateTime<Utc>,
    count: u32,
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { limit: u32, remaining: u32 },
    Limited { limit: u32, retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn limit(&self) -> u32 {
        match self {
            Self::Allowed { limit, .. } | Self::Limited { limit, .. } => *limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            Self::Allowed { remaining, .. } => *remaining,
            Self::Limited { .. } => 0,
        }
    }

    /// Whole seconds until the window resets, at least 1
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Limited { retry_after, .. } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            Self::Allowed { .. } => None,
        }
    }
}

pub struct FixedWindowRateLimiter {
    limit: u32,
    window: chrono::Duration,
    counters: Mutex<HashMap<String, WindowCounter>>,
    clock: Arc<dyn ClockPort>,
}

impl FixedWindowRateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            limit: config.limit,
            window: chrono::Duration::from_std(config.window)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            counters: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Count one request from `client` and decide whether it may proceed
    pub async fn admit(&self, client: &str) -> RateDecision {
        let now = self.clock.now();
        let mut counters = self.counters.lock().await;

        let counter = counters
            .entry(client.to_string())
            .or_insert(WindowCounter {
                window_start: now,
                count: 0,
            });
        if now - counter.window_start > self.window {
            counter.window_start = now;
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);

        if counter.count > self.limit {
            let reset_at = counter.window_start + self.window;
            let retry_after = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
            warn!(client, count = counter.count, limit = self.limit, "Rate limit exceeded");
            RateDecision::Limited {
                limit: self.limit,
                retry_after,
            }
        } else {
            debug!(client, count = counter.count, limit = self.limit, "Request admitted");
            RateDecision::Allowed {
                limit: self.limit,
                remaining: self.limit - counter.count,
            }
        }
    }

    /// Drop counters whose window has already expired
    pub async fn prune(&self) -> usize {
        let now = self.clock.now();
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| now - counter.window_start <= self.window);
        before - counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;

    fn limiter(limit: u32) -> (FixedWindowRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let config = RateLimitConfig {
            limit,
            window: Duration::from_secs(60),
        };
        (FixedWindowRateLimiter::new(&config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_request_over_limit_is_rejected() {
        let (limiter, _) = limiter(12);

        for n in 1..=12 {
            let decision = limiter.admit("10.0.0.1").await;
            assert!(decision.is_allowed());
            assert_eq!(decision.remaining(), 12 - n);
        }

        let decision = limiter.admit("10.0.0.1").await;
        assert!(!decision.is_allowed());
        assert_eq!(decision.limit(), 12);
        assert_eq!(decision.remaining(), 0);
        assert_eq!(decision.retry_after_secs(), Some(60));

        // Other clients are unaffected
        assert!(limiter.admit("10.0.0.2").await.is_allowed());
    }

    #[tokio::test]
    async fn test_window_resets_only_after_it_has_fully_elapsed() {
        let (limiter, clock) = limiter(2);
        limiter.admit("client").await;
        limiter.admit("client").await;
        assert!(!limiter.admit("client").await.is_allowed());

        clock.advance(chrono::Duration::seconds(60));
        assert!(!limiter.admit("client").await.is_allowed());

        clock.advance(chrono::Duration::seconds(1));
        let decision = limiter.admit("client").await;
        assert_eq!(
            decision,
            RateDecision::Allowed {
                limit: 2,
                remaining: 1
            }
        );
    }

    #[tokio::test]
    async fn test_prune_drops_expired_windows() {
        let (limiter, clock) = limiter(5);
        limiter.admit("old").await;
        clock.advance(chrono::Duration::seconds(61));
        limiter.admit("fresh").await;

        assert_eq!(limiter.prune().await, 1);
        assert_eq!(limiter.admit("fresh").await.remaining(), 3);
    }
}
