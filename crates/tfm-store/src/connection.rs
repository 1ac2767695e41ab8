//! Reconnection with exponential backoff
//!
//! Opening the store is retried while the database cannot be reached:
//! 500ms, 1s, 2s, 4s, ... capped at `max_backoff_ms` with the default
//! [`ConnectionConfig`]. Once connected, readiness is reported per request
//! through `IDocumentStore::is_ready`.

use std::future::Future;
use std::time::Duration;

use tfm_core::config::ConnectionConfig;

use crate::StoreError;

/// Backoff schedule for (re)connecting to the database
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    /// `0` retries forever
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_attempts: u32,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            max_attempts,
        }
    }

    /// A policy that makes a single attempt
    pub fn no_retry() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1.0, 1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the `attempt`-th failure (1-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts != 0 && attempt >= self.max_attempts
    }

    /// Runs `connect` until it succeeds or the attempts are exhausted
    ///
    /// # Errors
    ///
    /// Returns the last error once `max_attempts` attempts have failed.
    pub async fn connect_with_retry<F, Fut, T>(&self, mut connect: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match connect().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Connected to document store after retry");
                    }
                    return Ok(value);
                }
                Err(e) if self.exhausted(attempt) => {
                    tracing::error!(attempt, error = %e, "Giving up connecting to document store");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Document store unreachable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ConnectionConfig::default())
    }
}

impl From<&ConnectionConfig> for ReconnectPolicy {
    fn from(config: &ConnectionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
            config.multiplier,
            config.max_attempts,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_delay_grows_exponentially_and_caps() {
        let policy = ReconnectPolicy::new(
            Duration::from_millis(500),
            Duration::from_secs(3),
            2.0,
            5,
        );
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn test_from_config() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let policy =
            ReconnectPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 2.0, 5);
        let calls = AtomicU32::new(0);

        let value = policy
            .connect_with_retry(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(StoreError::ConnectionFailed("refused".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let policy =
            ReconnectPolicy::new(Duration::from_millis(10), Duration::from_millis(50), 2.0, 3);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .connect_with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::ConnectionFailed("refused".into())) }
            })
            .await;

        assert!(matches!(result, Err(StoreError::ConnectionFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = ReconnectPolicy::no_retry()
            .connect_with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::ConnectionFailed("refused".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
