//! `RetryPolicy` — grounded on `tools/nika/src/resilience/retry.rs`:
//! a builder-style config, exponential backoff with jitter, and an
//! `is_retryable` check against the crate's own error taxonomy.

use std::time::Duration;

use rand::Rng;

use crate::error::GraphError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    pub fn with_multiplier(mut self, m: f64) -> Self {
        self.multiplier = m;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Exponential backoff with +/-20% jitter, capped at `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter_fraction = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_secs_f64(capped * jitter_fraction)
    }

    pub fn is_retryable(error: &GraphError) -> bool {
        error.is_retryable()
    }

    /// Run `f` up to `max_retries + 1` times, retrying only on a retryable
    /// error, sleeping `calculate_delay(attempt)` between tries.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, GraphError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, GraphError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && Self::is_retryable(&err) => {
                    tokio::time::sleep(self.calculate_delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn delay_grows_and_is_capped() {
        let policy = RetryPolicy::default().with_max_delay(Duration::from_millis(500));
        let delay = policy.calculate_delay(10);
        assert!(delay <= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy::default()
            .with_max_retries(3)
            .with_initial_delay(Duration::from_millis(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = policy
            .execute(move || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(GraphError::ActionTimeout {
                            name: "fetch".into(),
                            timeout_ms: 10,
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<(), GraphError> = policy
            .execute(move || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(GraphError::CycleDetected { path: vec![] })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
