//! Retry loop for per-item resolution.
//!
//! # Design Decisions
//! - Only errors the caller marks retryable are retried
//! - At most `max_retries` retries; waits double from `base_delay`
//! - Cancellation is checked before every attempt and cuts a pending wait short

use std::future::Future;
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::lifecycle::CancelSignal;
use crate::observability::metrics;
use crate::resilience::backoff::{apply_jitter, calculate_backoff};

/// Retry parameters shared by every item of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::MAX,
            jitter_ratio: 0.0,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_ratio: config.jitter_ratio,
        }
    }

    /// Wait before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let max_ms = self.max_delay.as_millis().min(u64::MAX as u128) as u64;
        calculate_backoff(retry, base_ms, max_ms)
    }

    /// Upper bound on time spent waiting for one item without jitter:
    /// `base * (2^max_retries - 1)` when uncapped.
    pub fn max_total_delay(&self) -> Duration {
        (1..=self.max_retries).map(|r| self.delay_for(r)).sum()
    }
}

/// How a retried operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Failed { error: E, attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Run `operation` until it succeeds, fails terminally, runs out of retries,
/// or `cancel` fires.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    cancel: &CancelSignal,
    mut operation: F,
    is_retryable: R,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempts = 0u32;
    let mut retries = 0u32;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled { attempts };
        }

        attempts += 1;
        let error = match operation().await {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts },
            Err(error) => error,
        };

        if !is_retryable(&error) || retries >= policy.max_retries {
            return RetryOutcome::Failed { error, attempts };
        }

        retries += 1;
        let delay = apply_jitter(policy.delay_for(retries), policy.jitter_ratio);
        metrics::record_retry();
        tracing::debug!(attempt = attempts, delay = ?delay, "Retrying after failure");

        let mut cancelled = cancel.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancelled.cancelled() => return RetryOutcome::Cancelled { attempts },
        }
    }
}
