//! Fixed-interval retry helper.
//!
//! Unlike an error-driven retry loop, the attempt closure decides whether its
//! outcome warrants another attempt. The final outcome is always handed back,
//! so a caller can still interpret e.g. a transient HTTP status after the last try.

use crate::{ErrorEnvelope, RequestContext, Result};
use std::future::Future;
use std::time::Duration;

/// Default number of attempts (including the first try).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Retry policy with a constant pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIntervalRetry {
    /// Maximum attempts (including the first try). Zero behaves like one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub interval: Duration,
}

impl FixedIntervalRetry {
    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    const fn attempts(self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

impl Default for FixedIntervalRetry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL)
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    /// Stop retrying and return this value.
    Done(T),
    /// The value is transient; retry unless attempts are exhausted.
    Retry(T),
}

/// Run `op` up to `policy.max_attempts` times, sleeping `policy.interval`
/// between attempts while the outcome asks for a retry.
///
/// `op` receives the 1-based attempt number. Errors returned by `op` stop the
/// loop immediately. `on_retry` runs before each sleep with the attempt that
/// just finished. The sleep is cancellation-aware.
pub async fn retry_fixed_interval<T, F, Fut, Obs>(
    ctx: &RequestContext,
    policy: FixedIntervalRetry,
    operation: &'static str,
    mut op: F,
    mut on_retry: Obs,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<AttemptOutcome<T>>>,
    Obs: FnMut(u32, &T),
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        match op(attempt).await? {
            AttemptOutcome::Done(value) => return Ok(value),
            AttemptOutcome::Retry(value) => {
                if attempt >= attempts {
                    return Ok(value);
                }
                on_retry(attempt, &value);
                sleep_with_cancellation(ctx, policy.interval, operation).await?;
            },
        }
    }
}

async fn sleep_with_cancellation(
    ctx: &RequestContext,
    delay: Duration,
    operation: &'static str,
) -> Result<()> {
    tokio::select! {
        () = ctx.cancelled() => Err(cancelled_error(operation)),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}
