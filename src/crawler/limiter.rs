//! Crawl-wide request spacing
//!
//! One limiter is shared by every worker. Request starts (page fetches,
//! retries and robots.txt fetches alike) are spaced at least `delay` apart,
//! regardless of how many workers are running.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Global rate limiter enforcing a minimum gap between request starts
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until a request may start, then records the start
    ///
    /// Callers queue on an async mutex, so waiters are released one at a
    /// time in arrival order. Dropping the returned future mid-wait (on
    /// cancellation) gives up the turn without recording a request.
    pub async fn acquire(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let wait = self.delay - elapsed;
                tracing::trace!("Rate limit: waiting {}ms", wait.as_millis());
                sleep(wait).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
