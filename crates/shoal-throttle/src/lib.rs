//! Request throttling for external API clients.
//!
//! Remote APIs are budgeted in requests per hour. Each client owns one
//! `Throttle` (shared via `Arc` across all callers in the process) and
//! awaits `acquire` before every request.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

struct Bucket {
    tokens: f64,
    max_tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        self.last_refill = now;
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one full token is available.
    fn secs_until_token(&self) -> f64 {
        ((1.0 - self.tokens) / self.refill_per_sec).max(0.0)
    }
}

/// Token bucket sized to a requests-per-hour budget. Starts full.
pub struct Throttle {
    bucket: Mutex<Bucket>,
}

impl Throttle {
    pub fn per_hour(requests: u32) -> Self {
        let max = requests.max(1) as f64;
        Self {
            bucket: Mutex::new(Bucket {
                tokens: max,
                max_tokens: max,
                refill_per_sec: max / 3600.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token without waiting. Returns false when the budget is
    /// exhausted.
    pub async fn try_acquire(&self) -> bool {
        self.bucket.lock().await.try_consume(Instant::now())
    }

    /// Wait until a token is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait_secs = {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_consume(Instant::now()) {
                    return;
                }
                bucket.secs_until_token()
            };
            tracing::debug!(wait_secs, "request budget exhausted, waiting for refill");
            sleep(Duration::from_secs_f64(wait_secs.max(0.05))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_drains_then_rejects() {
        let throttle = Throttle::per_hour(3);
        assert!(throttle.try_acquire().await);
        assert!(throttle.try_acquire().await);
        assert!(throttle.try_acquire().await);
        assert!(!throttle.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn refills_over_time() {
        let throttle = Throttle::per_hour(3600); // one token per second
        while throttle.try_acquire().await {}
        sleep(Duration::from_secs(2)).await;
        assert!(throttle.try_acquire().await);
        assert!(throttle.try_acquire().await);
        assert!(!throttle.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_refill() {
        let throttle = Throttle::per_hour(3600);
        while throttle.try_acquire().await {}
        // Paused clock: this returns as soon as the sleep advances past the
        // refill point instead of blocking the test for a wall-clock second.
        throttle.acquire().await;
    }
}
