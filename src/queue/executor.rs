//! Per-request retry execution.
//!
//! Each admitted request runs its attempts in its own task: call the work,
//! classify the failure, feed throttle signals back into the adaptive state,
//! and sleep a jittered exponential backoff between attempts. The terminal
//! outcome is delivered exactly once through the request's channel.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_retry::strategy::ExponentialBackoff;

use super::{Inner, QueueCore};
use crate::config::{RetryConfig, RETRY_JITTER_FRACTION};
use crate::error_handling::{classify, CallError, QueueError, RetryTrigger};

pub(super) async fn run_attempts<T, F, Fut>(
    core: Arc<QueueCore>,
    mut work: F,
    tx: oneshot::Sender<Result<T, QueueError>>,
) where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, CallError>> + Send + 'static,
{
    let retry = &core.config.retry;
    let mut backoff = backoff_series(retry);
    let mut attempt: u32 = 0;

    let outcome = loop {
        match work().await {
            Ok(value) => {
                let mut inner = core.inner.lock().await;
                inner.adaptive.record_outcome(false);
                drop(inner);
                core.completed.fetch_add(1, Ordering::SeqCst);
                break Ok(value);
            }
            Err(error) => {
                let Some(trigger) = classify(&error, &retry.retry_on_statuses) else {
                    log::warn!("Request failed with non-retryable error: {error}");
                    core.failed.fetch_add(1, Ordering::SeqCst);
                    break Err(QueueError::Call(error));
                };

                let mut inner = core.inner.lock().await;
                // The adaptive state learns about the throttle even when the
                // retry budget is spent, so later requests see the reduced
                // ceiling.
                if trigger.throttled {
                    inner.adaptive.record_outcome(true);
                }

                if attempt >= retry.max_retries {
                    drop(inner);
                    log::warn!(
                        "Retry budget exhausted after {} attempts (last error: {error})",
                        attempt + 1
                    );
                    core.failed.fetch_add(1, Ordering::SeqCst);
                    break Err(QueueError::RateLimitExceeded {
                        attempts: attempt + 1,
                        last_status: trigger.status,
                    });
                }

                inner.retry_stats.record(&trigger);
                let base = backoff.next().unwrap_or(retry.max_delay);
                let delay = retry_delay(&mut inner, retry, &trigger, base);
                drop(inner);

                attempt += 1;
                log::debug!(
                    "Attempt {attempt} failed ({error}), retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    };

    // Receiver may have been dropped; the request still ran to completion.
    let _ = tx.send(outcome);
}

/// Delay before the next attempt.
///
/// A throttle with a server-provided hint sleeps exactly that hint. A throttle
/// while the window is still at the adaptive ceiling waits for the oldest
/// admission to age out instead, since retrying sooner would only be throttled
/// again. Everything else gets the exponential backoff step plus up to 30%
/// jitter, capped at the configured maximum.
fn retry_delay(
    inner: &mut Inner,
    retry: &RetryConfig,
    trigger: &RetryTrigger,
    base: Duration,
) -> Duration {
    if trigger.throttled {
        if let Some(hint) = trigger.retry_after {
            return hint;
        }
        let now = Instant::now();
        inner.window.prune(now);
        if inner.window.len() >= inner.adaptive.adaptive_max_requests() as usize {
            if let Some(until_slot) = inner.window.time_until_next_slot(now) {
                return until_slot;
            }
        }
    }

    let jitter = base.mul_f64(rand::rng().random::<f64>() * RETRY_JITTER_FRACTION);
    base.saturating_add(jitter).min(retry.max_delay)
}

/// Exponential series starting at `base_delay` and doubling each step.
///
/// `ExponentialBackoff::from_millis(2)` doubles its raw value per step; with a
/// factor of `base/2` the yielded delays are exactly `base * 2^n`, capped at
/// the configured maximum. Attempt count is bounded by the caller, not the
/// iterator.
fn backoff_series(retry: &RetryConfig) -> ExponentialBackoff {
    let base_ms = retry.base_delay.as_millis() as u64;
    ExponentialBackoff::from_millis(2)
        .factor((base_ms / 2).max(1))
        .max_delay(retry.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_series_doubles_from_base() {
        let retry = RetryConfig {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            ..RetryConfig::default()
        };
        let delays: Vec<Duration> = backoff_series(&retry).take(4).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn test_backoff_series_caps_at_max_delay() {
        let retry = RetryConfig {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(5),
            ..RetryConfig::default()
        };
        let delays: Vec<Duration> = backoff_series(&retry).take(5).collect();
        assert_eq!(delays[3], Duration::from_secs(5));
        assert_eq!(delays[4], Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_never_exceeds_max_delay() {
        let retry = RetryConfig::default();
        let trigger = RetryTrigger {
            status: Some(503),
            throttled: false,
            retry_after: None,
            kind: crate::error_handling::TriggerKind::ServerError,
        };
        let mut inner = test_inner(10, Duration::from_secs(60));
        for _ in 0..100 {
            let delay = retry_delay(&mut inner, &retry, &trigger, retry.max_delay);
            assert!(delay <= retry.max_delay);
        }
    }

    #[test]
    fn test_jitter_bounded_above_base() {
        let retry = RetryConfig::default();
        let trigger = RetryTrigger {
            status: None,
            throttled: false,
            retry_after: None,
            kind: crate::error_handling::TriggerKind::Timeout,
        };
        let base = Duration::from_secs(2);
        let mut inner = test_inner(10, Duration::from_secs(60));
        for _ in 0..100 {
            let delay = retry_delay(&mut inner, &retry, &trigger, base);
            assert!(delay >= base);
            assert!(delay <= base.mul_f64(1.0 + RETRY_JITTER_FRACTION));
        }
    }

    #[test]
    fn test_retry_after_hint_wins_for_throttles() {
        let retry = RetryConfig::default();
        let trigger = RetryTrigger {
            status: Some(429),
            throttled: true,
            retry_after: Some(Duration::from_secs(7)),
            kind: crate::error_handling::TriggerKind::Throttled,
        };
        let mut inner = test_inner(10, Duration::from_secs(60));
        let delay = retry_delay(&mut inner, &retry, &trigger, Duration::from_secs(1));
        assert_eq!(delay, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_throttle_at_full_window_waits_for_slot() {
        let retry = RetryConfig::default();
        let trigger = RetryTrigger {
            status: Some(429),
            throttled: true,
            retry_after: None,
            kind: crate::error_handling::TriggerKind::Throttled,
        };
        let mut inner = test_inner(2, Duration::from_secs(10));
        let now = Instant::now();
        inner.window.record(now);
        inner.window.record(now);

        let delay = retry_delay(&mut inner, &retry, &trigger, Duration::from_secs(1));
        // Oldest slot frees in roughly the full window.
        assert!(delay > Duration::from_secs(9));
        assert!(delay <= Duration::from_secs(10));
    }

    fn test_inner(max_requests: u32, window: Duration) -> Inner {
        Inner {
            queue: std::collections::VecDeque::new(),
            window: crate::window::AdmissionWindow::new(window),
            adaptive: crate::adaptive::AdaptiveState::new(max_requests),
            retry_stats: crate::error_handling::RetryStats::new(),
            loop_running: false,
        }
    }
}
