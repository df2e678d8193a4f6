//! Configuration constants.
//!
//! This module defines the default tuning parameters for the admission queue:
//! burst thresholds, adaptive backoff bounds, and retry policy defaults.

use std::time::Duration;

// Burst admission
/// Fraction of adaptive capacity below which a request may execute immediately
/// with no inter-admission delay. With the default of 0.5, bursting is allowed
/// while the window is less than half full.
pub const DEFAULT_BURST_UTILIZATION_THRESHOLD: f64 = 0.5;
/// Fraction of adaptive capacity that window occupancy plus queued work must
/// stay below for bursting to remain allowed. This keeps a burst from
/// committing the entire window to work that is already waiting.
pub const DEFAULT_BURST_QUEUE_THRESHOLD: f64 = 0.8;
/// When queue depth exceeds this fraction of adaptive capacity, the burst
/// utilization threshold is halved. Backlog means demand is outpacing the
/// window, so bursting gets more conservative.
pub const BURST_BACKLOG_FRACTION: f64 = 0.25;

// Admission hysteresis
/// Above this fraction of adaptive capacity, admission additionally requires
/// occupancy at or below `ADMIT_HYSTERESIS_LOW` (a conservative band that
/// avoids admitting requests likely to be throttled).
pub const ADMIT_HYSTERESIS_HIGH: f64 = 0.9;
/// Lower edge of the hysteresis band. See `ADMIT_HYSTERESIS_HIGH`.
pub const ADMIT_HYSTERESIS_LOW: f64 = 0.85;

// Inter-admission pacing
/// Floor spacing between non-burst admissions.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);
/// Utilization above which the cubic saturation penalty applies to the
/// inter-admission delay.
pub const SATURATION_UTILIZATION: f64 = 0.9;
/// Multiplier applied to the cubic saturation penalty.
pub const SATURATION_PENALTY_FACTOR: f64 = 5.0;
/// Minimum inter-admission delay while in the saturation band.
pub const SATURATION_MIN_DELAY: Duration = Duration::from_millis(1000);
/// Buffer added when sleeping until the oldest window entry expires, so the
/// re-check lands after the slot has actually freed.
pub const ADMISSION_RECHECK_BUFFER: Duration = Duration::from_millis(100);

// Adaptive capacity
/// Multiplicative decrease applied to the backoff multiplier on a throttle
/// signal.
pub const BACKOFF_SHRINK_FACTOR: f64 = 0.75;
/// Multiplicative increase applied to the backoff multiplier on a success.
/// Recovery is gradual (about 2% per success) to avoid oscillation.
pub const BACKOFF_GROW_FACTOR: f64 = 1.02;
/// Floor for the backoff multiplier. Capacity never shrinks below a quarter
/// of the nominal ceiling.
pub const BACKOFF_MULTIPLIER_MIN: f64 = 0.25;
/// Burst mode requires the multiplier to be at least this value: a limiter
/// still recovering from a recent throttle does not burst.
pub const BURST_RECOVERY_MULTIPLIER: f64 = 0.9;

// Retry strategy
/// Maximum number of retries after the initial attempt.
pub const DEFAULT_RETRY_MAX_RETRIES: u32 = 3;
/// Initial delay before the first retry; doubles with each attempt.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Maximum delay between retries.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
/// Fraction of the backoff delay added as random jitter, desynchronizing
/// retries across concurrent callers.
pub const RETRY_JITTER_FRACTION: f64 = 0.3;

// HTTP status codes (for clarity and consistency)
/// The throttle status: HTTP 429 Too Many Requests.
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
/// Statuses retried by default: throttling plus transient gateway errors.
pub const DEFAULT_RETRY_ON_STATUSES: [u16; 4] = [429, 502, 503, 504];
