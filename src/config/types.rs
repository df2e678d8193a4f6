//! Queue and retry configuration types.

use std::time::Duration;

use super::constants::*;
use crate::error_handling::QueueError;

/// Configuration for a [`RequestQueue`](crate::RequestQueue).
///
/// `max_requests` and `window` define the nominal sliding-window budget; the
/// remaining fields tune burst admission, pacing, and retries. All fields are
/// immutable once the queue is constructed -- the only capacity that moves at
/// runtime is the adaptive ceiling, which stays at or below `max_requests`.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Nominal capacity: maximum admissions per sliding window.
    pub max_requests: u32,
    /// Sliding window length.
    pub window: Duration,
    /// Fraction of adaptive capacity below which requests are admitted with
    /// zero inter-admission delay.
    pub burst_utilization_threshold: f64,
    /// Fraction of adaptive capacity that occupancy plus queue depth must stay
    /// below for bursting to remain allowed.
    pub burst_queue_threshold: f64,
    /// Floor spacing between non-burst admissions.
    pub min_delay: Duration,
    /// Retry policy applied to each admitted request.
    pub retry: RetryConfig,
}

/// Retry policy for a single admitted request.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt. A request makes at most
    /// `max_retries + 1` total attempts.
    pub max_retries: u32,
    /// Delay before the first retry; doubles with each subsequent attempt.
    pub base_delay: Duration,
    /// Cap on any single retry delay.
    pub max_delay: Duration,
    /// HTTP statuses that trigger a retry.
    pub retry_on_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: DEFAULT_RETRY_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
            retry_on_statuses: DEFAULT_RETRY_ON_STATUSES.to_vec(),
        }
    }
}

impl QueueConfig {
    /// Creates a configuration with the given window budget and default burst,
    /// pacing, and retry settings.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        QueueConfig {
            max_requests,
            window,
            burst_utilization_threshold: DEFAULT_BURST_UTILIZATION_THRESHOLD,
            burst_queue_threshold: DEFAULT_BURST_QUEUE_THRESHOLD,
            min_delay: DEFAULT_MIN_DELAY,
            retry: RetryConfig::default(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if the capacity or window is
    /// zero, a burst threshold falls outside `(0.0, 1.0]`, or the retry base
    /// delay is zero.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_requests == 0 {
            return Err(QueueError::InvalidConfig(
                "max_requests must be greater than 0".into(),
            ));
        }
        if self.window.is_zero() {
            return Err(QueueError::InvalidConfig(
                "window must be greater than 0".into(),
            ));
        }
        for (name, value) in [
            (
                "burst_utilization_threshold",
                self.burst_utilization_threshold,
            ),
            ("burst_queue_threshold", self.burst_queue_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(QueueError::InvalidConfig(format!(
                    "{name} must be in (0.0, 1.0], got {value}"
                )));
            }
        }
        if self.retry.base_delay.is_zero() {
            return Err(QueueError::InvalidConfig(
                "retry.base_delay must be greater than 0".into(),
            ));
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(QueueError::InvalidConfig(
                "retry.max_delay must be at least retry.base_delay".into(),
            ));
        }
        Ok(())
    }
}
