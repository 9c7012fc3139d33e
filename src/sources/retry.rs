//! Exponential backoff for source requests.
//!
//! The module uses a trait-based design:
//! - [`FetchAsync`]: one async request keyed by a string (a date, a query)
//! - [`RetryFetch`]: decorator that retries any [`FetchAsync`] with backoff
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// A single async request that may fail transiently.
pub trait FetchAsync {
    type Response;
    type Error: fmt::Display;

    async fn fetch(&self, key: &str) -> Result<Self::Response, Self::Error>;
}

/// Retries the wrapped [`FetchAsync`] with exponential backoff and jitter.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    /// Wrap `inner`, allowing up to `max_retries` retries after the first attempt.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync,
{
    type Response = T::Response;
    type Error = T::Error;

    #[instrument(level = "debug", skip_all, fields(%key))]
    async fn fetch(&self, key: &str) -> Result<Self::Response, Self::Error> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(key).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(attempt, max = self.max_retries, elapsed_ms_total, error = %e, "fetch exhausted retries");
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(attempt, max = self.max_retries, elapsed_ms_total, ?delay, error = %e, "fetch attempt failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}
