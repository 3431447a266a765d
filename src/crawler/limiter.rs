//! Global request spacing
//!
//! One limiter instance is shared by every fetch of a run (discovery,
//! robots.txt, sitemaps and retrieval workers alike), so the total request
//! rate stays bounded no matter how many tasks are issuing requests.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct LimiterState {
    interval: Duration,
    last_release: Option<Instant>,
}

/// Enforces a minimum interval between consecutive outbound requests
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                interval,
                last_release: None,
            }),
        }
    }

    /// Waits until the interval has elapsed since the previous call returned
    ///
    /// The lock is held while sleeping, so concurrent callers are released one
    /// at a time, each a full interval after the one before.
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_release {
            let elapsed = last.elapsed();
            if elapsed < state.interval {
                let remaining = state.interval - elapsed;
                tracing::trace!("Rate limiter sleeping for {:?}", remaining);
                tokio::time::sleep(remaining).await;
            }
        }

        state.last_release = Some(Instant::now());
    }

    /// Returns the current minimum interval
    pub async fn interval(&self) -> Duration {
        self.state.lock().await.interval
    }

    /// Raises the interval to `minimum` if it is currently smaller
    ///
    /// # Returns
    ///
    /// The interval in effect after the call
    pub async fn widen_to(&self, minimum: Duration) -> Duration {
        let mut state = self.state.lock().await;
        if minimum > state.interval {
            state.interval = minimum;
        }
        state.interval
    }
}
