use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::effects::EffectError;
use super::outcome::EffectOutcome;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Bounds applied to every external effect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after that.
    pub initial_backoff: Duration,
    /// Ceiling on a single attempt.
    pub effect_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            effect_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Single attempt with no waiting, handy for tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            effect_timeout: Duration::from_secs(5),
        }
    }

    pub(crate) fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }

    /// Run `operation` on the blocking pool until it succeeds, fails permanently,
    /// or the attempt budget is spent. A blocking call cannot be cancelled, so an
    /// attempt that outlives `effect_timeout` is reported as `TimedOut` and never retried.
    pub(crate) async fn run<F>(&self, effect: &'static str, operation: F) -> EffectOutcome
    where
        F: Fn() -> Result<(), EffectError> + Send + Sync + 'static,
    {
        let operation = Arc::new(operation);
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let call = Arc::clone(&operation);
            let handle = tokio::task::spawn_blocking(move || call());

            let error = match tokio::time::timeout(self.effect_timeout, handle).await {
                Ok(Ok(Ok(()))) => {
                    debug!(effect, attempt, "effect succeeded");
                    return EffectOutcome::Succeeded { attempts: attempt };
                }
                Ok(Ok(Err(error))) => error,
                Ok(Err(join_error)) => {
                    EffectError::Permanent(format!("effect task aborted: {join_error}"))
                }
                Err(_) => {
                    let after_ms =
                        u64::try_from(self.effect_timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(effect, attempt, after_ms, "effect timed out, outcome unknown");
                    return EffectOutcome::TimedOut {
                        attempts: attempt,
                        after_ms,
                    };
                }
            };

            if !error.is_transient() || attempt >= max_attempts {
                warn!(effect, attempt, error = %error, "effect failed");
                return EffectOutcome::Failed {
                    reason: error.reason().to_string(),
                    attempts: attempt,
                    permanent: !error.is_transient(),
                };
            }

            let delay = self.backoff_for(attempt);
            debug!(effect, attempt, ?delay, error = %error, "retrying effect");
            tokio::time::sleep(delay).await;
        }
    }
}
