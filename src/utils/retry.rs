//! Bounded-attempt retry around a single fallible step
//!
//! Each wrapped step gets its own budget: navigation, extraction and the
//! evidence upload are retried independently of one another.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::MonitorError;

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Delay doubles after each failed attempt
    Exponential,
}

/// Retry configuration for one wrapped step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (0 is treated as 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(2000),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor)
            }
        }
    }

    fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Result of running an operation under a retry policy
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    /// The last error, unmodified, and the attempt it came from
    Failed { error: MonitorError, attempts: u32 },
}

impl<T> AttemptOutcome<T> {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            AttemptOutcome::Succeeded { attempts, .. } | AttemptOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_result(self) -> Result<T, MonitorError> {
        match self {
            AttemptOutcome::Succeeded { value, .. } => Ok(value),
            AttemptOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Run `op` until it succeeds, a non-retryable error occurs, or the
/// attempt budget is spent. `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(operation: &str, policy: &RetryPolicy, mut op: F) -> AttemptOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, MonitorError>>,
{
    let budget = policy.attempt_budget();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                debug!(operation, attempt, "attempt succeeded");
                return AttemptOutcome::Succeeded { value, attempts: attempt };
            }
            Err(error) => {
                if !error.is_retryable() {
                    warn!(operation, attempt, %error, "non-retryable error, failing fast");
                    return AttemptOutcome::Failed { error, attempts: attempt };
                }

                if attempt >= budget {
                    warn!(operation, attempt, max_attempts = budget, %error, "retry budget exhausted");
                    return AttemptOutcome::Failed { error, attempts: attempt };
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed, attempt {}/{}, retrying in {}ms: {}",
                    operation,
                    attempt,
                    budget,
                    delay.as_millis(),
                    error
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(500),
            backoff: Backoff::Exponential,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }

    #[test]
    fn fixed_delay_is_constant() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), policy.delay_after(3));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let outcome = with_retry("noop", &policy, |_| async { Ok::<_, MonitorError>(7) }).await;
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.into_result(), Ok(7));
    }
}
