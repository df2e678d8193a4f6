//! Admission decisions.
//!
//! Pure functions deciding, from window occupancy, queue depth, and adaptive
//! state, whether a request runs now, runs as part of a burst, or waits -- and
//! for how long. The dispatch loop applies these decisions; nothing here
//! mutates state.

use std::time::Duration;
use tokio::time::Instant;

use crate::adaptive::AdaptiveState;
use crate::config::{
    QueueConfig, ADMISSION_RECHECK_BUFFER, ADMIT_HYSTERESIS_HIGH, ADMIT_HYSTERESIS_LOW,
    BURST_BACKLOG_FRACTION, BURST_RECOVERY_MULTIPLIER, SATURATION_MIN_DELAY,
    SATURATION_PENALTY_FACTOR, SATURATION_UTILIZATION,
};
use crate::window::AdmissionWindow;

/// Whether one more request may be admitted right now.
///
/// Occupancy must be below the adaptive ceiling. Above 90% of the ceiling a
/// conservative hysteresis band applies: occupancy must also be at or below
/// 85%, so admissions stop slightly before saturation instead of riding the
/// edge and getting throttled.
pub(crate) fn can_admit(occupancy: usize, adaptive: &AdaptiveState) -> bool {
    let ceiling = adaptive.adaptive_max_requests() as usize;
    if occupancy >= ceiling {
        return false;
    }
    let occupancy = occupancy as f64;
    let ceiling = ceiling as f64;
    if occupancy > ceiling * ADMIT_HYSTERESIS_HIGH {
        return occupancy <= ceiling * ADMIT_HYSTERESIS_LOW;
    }
    true
}

/// Whether the next admission may skip inter-admission pacing entirely.
///
/// Bursting requires low utilization (threshold halved when a backlog has
/// built up), headroom for both the window and the queued work, and a limiter
/// that is not actively recovering from a recent throttle.
pub(crate) fn should_burst(
    occupancy: usize,
    queue_depth: usize,
    adaptive: &AdaptiveState,
    config: &QueueConfig,
) -> bool {
    let ceiling = f64::from(adaptive.adaptive_max_requests());
    let utilization = occupancy as f64 / ceiling;

    let mut threshold = config.burst_utilization_threshold;
    if queue_depth as f64 > ceiling * BURST_BACKLOG_FRACTION {
        threshold /= 2.0;
    }

    utilization < threshold
        && (occupancy + queue_depth) as f64 / ceiling < config.burst_queue_threshold
        && adaptive.backoff_multiplier() >= BURST_RECOVERY_MULTIPLIER
}

/// Pacing delay to apply after the current admission.
///
/// Zero in burst mode. Near saturation the base spacing is scaled by the cube
/// of utilization (times a penalty factor) so admission slows sharply before
/// overshooting the window. With capacity to spare for everything queued, the
/// configured floor spacing applies; otherwise spacing grows with utilization.
pub(crate) fn next_delay(
    occupancy: usize,
    queue_depth: usize,
    adaptive: &AdaptiveState,
    config: &QueueConfig,
) -> Duration {
    if should_burst(occupancy, queue_depth, adaptive, config) {
        return Duration::ZERO;
    }

    let ceiling = adaptive.adaptive_max_requests();
    let utilization = occupancy as f64 / f64::from(ceiling);
    let base_spacing = config.window.div_f64(f64::from(ceiling));

    if utilization > SATURATION_UTILIZATION {
        let penalized =
            base_spacing.mul_f64(utilization.powi(3) * SATURATION_PENALTY_FACTOR);
        return penalized.max(SATURATION_MIN_DELAY);
    }

    let remaining = (ceiling as usize).saturating_sub(occupancy);
    if remaining >= queue_depth {
        return config.min_delay;
    }

    base_spacing
        .mul_f64((utilization * 2.0).min(1.0))
        .max(config.min_delay)
}

/// How long the dispatch loop should suspend when admission is not possible:
/// until the oldest window entry expires, plus a small buffer so the re-check
/// lands after the slot has freed.
pub(crate) fn wait_until_admissible(window: &AdmissionWindow, now: Instant) -> Duration {
    window
        .time_until_next_slot(now)
        .unwrap_or(Duration::ZERO)
        .saturating_add(ADMISSION_RECHECK_BUFFER)
}
