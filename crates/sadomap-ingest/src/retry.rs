//! Bounded retry with linear back-off for area fetches.
//!
//! [`retry_with_backoff`] wraps a fallible async source call and retries on
//! transient errors (transport failures, timeouts, 429, 5xx). Permanent errors
//! (other 4xx, malformed bodies, configuration problems) are returned
//! immediately. Every attempt is bounded by [`RetryPolicy::attempt_timeout`],
//! and the whole loop stops as soon as the cancellation token fires.

use std::future::Future;
use std::time::Duration;

use sadomap_core::AppConfig;
use tokio_util::sync::CancellationToken;

use crate::error::IngestError;

/// Retry knobs for one area fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before retry `n` is `base_delay * n`.
    pub base_delay: Duration,
    /// Upper bound for a single attempt; exceeding it is a transient failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Retry knobs from the environment; each attempt gets the configured
    /// request timeout.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            attempt_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Sleep inserted after the `attempt`-th failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Lifecycle of a single area fetch.
///
/// `Idle → Fetching → {Success, Retrying → Fetching, Failed}`. `Failed` and
/// `Success` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching { attempt: u32 },
    Retrying { attempt: u32, delay_ms: u64 },
    Success { attempts: u32 },
    Failed { attempts: u32 },
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** HTTP 429 and 5xx, transport failures, attempt timeouts.
///
/// **Not retriable:** other 4xx, malformed bodies, missing columns,
/// configuration and local I/O problems, cancellation.
pub(crate) fn is_transient(err: &IngestError) -> bool {
    match err {
        IngestError::Network { status, .. } => *status == 429 || *status >= 500,
        IngestError::Http(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
        IngestError::Timeout(_) => true,
        IngestError::Config(_)
        | IngestError::Deserialize { .. }
        | IngestError::Csv { .. }
        | IngestError::MissingColumn { .. }
        | IngestError::Io { .. }
        | IngestError::Cancelled => false,
    }
}

/// Runs `operation` up to `policy.max_attempts()` times.
///
/// Back-off schedule with `base_delay = 1 s`:
///
/// | Failed attempt | Sleep before next attempt |
/// |----------------|---------------------------|
/// | 1              | 1 s                       |
/// | 2              | 2 s                       |
/// | 3              | 3 s                       |
///
/// Returns [`IngestError::Cancelled`] if `cancel` fires while an attempt or a
/// back-off sleep is pending; the in-flight attempt is dropped.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
{
    let mut state = FetchState::Idle;
    tracing::debug!(area = label, ?state, "fetch state");
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        state = FetchState::Fetching { attempt };
        tracing::debug!(area = label, ?state, "fetch state");

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(IngestError::Cancelled),
            res = tokio::time::timeout(policy.attempt_timeout, operation()) => {
                res.unwrap_or_else(|_| Err(IngestError::Timeout(policy.attempt_timeout)))
            }
        };

        match outcome {
            Ok(value) => {
                state = FetchState::Success { attempts: attempt };
                tracing::debug!(area = label, ?state, "fetch state");
                return Ok(value);
            }
            Err(err) => {
                if !is_transient(&err) || attempt >= policy.max_attempts() {
                    state = FetchState::Failed { attempts: attempt };
                    tracing::debug!(area = label, ?state, error = %err, "fetch state");
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                state = FetchState::Retrying { attempt, delay_ms };
                tracing::warn!(
                    area = label,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    ?state,
                    error = %err,
                    "transient fetch error; retrying after back-off"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(IngestError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
