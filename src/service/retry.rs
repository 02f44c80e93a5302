use std::time::Duration;
use tracing::warn;

use crate::config::RetrySettings;
use crate::error::Result;

/// Bounded exponential backoff for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op`, retrying only while it fails with a transient error.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        what,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            attempts: settings.attempts,
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayflowError;

    fn instant(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            attempts: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(3_000),
        };
        let delays: Vec<u128> = (0..5).map(|r| policy.delay_for(r).as_millis()).collect();
        assert_eq!(delays, [500, 1000, 2000, 3000, 3000]);
        assert_eq!(policy.delay_for(40), Duration::from_millis(3_000));
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let mut calls = 0;
        let result = instant(3).run("fetch", || {
            calls += 1;
            if calls < 3 {
                Err(PayflowError::Transport("timeout".into()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_the_last_attempt() {
        let mut calls = 0;
        let result: Result<()> = instant(2).run("fetch", || {
            calls += 1;
            Err(PayflowError::Http {
                status: 503,
                body: String::new(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = instant(5).run("create", || {
            calls += 1;
            Err(PayflowError::Http {
                status: 400,
                body: "Property ApprovalNo invalid".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
