use crate::error::{LedgerError, LedgerResult};
use std::thread;
use std::time::Duration;

/// Bounded exponential backoff for writes that lose a lock race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts. Exhaustion surfaces as `StorageBusy`.
pub fn with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> LedgerResult<T>
where
    F: FnMut() -> LedgerResult<T>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(op = label, attempt, "write succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() => {
                if attempt == attempts {
                    tracing::warn!(op = label, attempts, error = %err, "retries exhausted");
                    break;
                }
                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    op = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "storage busy; backing off"
                );
                thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
    Err(LedgerError::StorageBusy { attempts })
}
