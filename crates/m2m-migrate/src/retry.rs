//! Retry policy for calls against the source workspace.

use crate::config::RetryConfig;
use crate::error::{MigrateError, Result};
use backon::{Backoff, BackoffBuilder, ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff, passed explicitly to the calls it guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Randomize each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff schedule for `backon`. Its `max_times` counts retries, not attempts.
    fn builder(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1));
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Delays between attempts, each at most `max_delay`.
    ///
    /// backon applies jitter on top of its own cap, so the cap is enforced
    /// again here.
    pub fn backoff(&self) -> impl Backoff {
        let cap = self.max_delay;
        self.builder().build().map(move |delay| delay.min(cap))
    }

    /// Run `f` until it succeeds, fails with a non-transient error, or the
    /// attempts are exhausted. The last error is returned unchanged.
    pub async fn run<F, Fut, T>(&self, what: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        f.retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(MigrateError::is_transient)
            .notify(|err: &MigrateError, dur: Duration| {
                warn!(
                    "{} failed: {}. Retrying in {:.1}s",
                    what,
                    err,
                    dur.as_secs_f32()
                );
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        }
    }

    fn unavailable() -> MigrateError {
        MigrateError::Api {
            status: 503,
            message: "TEMPORARILY_UNAVAILABLE".into(),
        }
    }

    #[test]
    fn test_default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
        assert!(policy.jitter);
    }

    #[test]
    fn test_jittered_delays_respect_cap() {
        let policy = RetryPolicy {
            max_attempts: 50,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: true,
        };

        let delays: Vec<Duration> = policy.backoff().collect();

        assert_eq!(delays.len(), 49);
        assert!(delays.iter().all(|d| *d <= policy.max_delay), "{:?}", delays);
        assert_eq!(delays.last(), Some(&policy.max_delay));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let result = fast_policy(5)
            .run("fetch", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = fast_policy(5)
            .run("fetch", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;

        assert!(matches!(result, Err(MigrateError::Api { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = fast_policy(5)
            .run("fetch", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MigrateError::Api {
                    status: 403,
                    message: "PERMISSION_DENIED".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy_single_attempt() {
        let calls = AtomicUsize::new(0);
        let _: Result<()> = RetryPolicy::no_retry()
            .run("fetch", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
