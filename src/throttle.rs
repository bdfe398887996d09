// Plutus — Request Throttle
//
// Token bucket guarding routes that reach the wallet node. Callers reserve a
// slot and sleep until it opens; nothing is dropped. Build one throttle per
// route at startup and share it.

use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error, PartialEq)]
pub enum ThrottleError {
    #[error("Rate limit exceeded, retry in {}ms", retry_after.as_millis())]
    RateLimited { retry_after: Duration },
}

#[derive(Debug)]
pub struct RequestThrottle {
    rate_per_sec: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    /// May go negative: each unit below zero is a caller already queued.
    tokens: f64,
    refilled_at: Instant,
}

impl RequestThrottle {
    /// A throttle admitting `rate_per_sec` calls per second, with bursts of
    /// the same size. A rate of zero is treated as one.
    pub fn per_second(rate_per_sec: u32) -> Self {
        let rate = f64::from(rate_per_sec.max(1));
        Self {
            rate_per_sec: rate,
            capacity: rate,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Wait for a slot, however long the queue is. A caller dropped while
    /// waiting gives its slot back.
    pub async fn acquire(&self) {
        let wait = self.reserve(None).unwrap_or_default();
        self.wait_for_slot(wait).await;
    }

    /// Wait for a slot unless the queueing delay would exceed `max_wait`,
    /// in which case no slot is taken.
    pub async fn acquire_within(&self, max_wait: Duration) -> Result<(), ThrottleError> {
        let wait = self.reserve(Some(max_wait))?;
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Request queued by throttle");
        }
        self.wait_for_slot(wait).await;
        Ok(())
    }

    async fn wait_for_slot(&self, wait: Duration) {
        if wait.is_zero() {
            return;
        }
        let reservation = Reservation {
            throttle: self,
            admitted: false,
        };
        tokio::time::sleep(wait).await;
        reservation.admit();
    }

    fn refund(&self) {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut bucket);
        bucket.tokens = (bucket.tokens + 1.0).min(self.capacity);
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        bucket.refilled_at = now;
    }

    fn reserve(&self, max_wait: Option<Duration>) -> Result<Duration, ThrottleError> {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut bucket);

        let after = bucket.tokens - 1.0;
        let wait = if after >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((-after / self.rate_per_sec * 1e9).ceil() as u64)
        };

        if let Some(max) = max_wait {
            if wait > max {
                return Err(ThrottleError::RateLimited { retry_after: wait - max });
            }
        }

        bucket.tokens = after;
        Ok(wait)
    }
}

/// A slot reserved by a waiting caller. Returned to the bucket if the
/// caller is dropped before its turn.
struct Reservation<'a> {
    throttle: &'a RequestThrottle,
    admitted: bool,
}

impl Reservation<'_> {
    fn admit(mut self) {
        self.admitted = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.admitted {
            self.throttle.refund();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
