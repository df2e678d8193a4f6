//! Adaptive capacity state.
//!
//! Tracks the effective admission ceiling as a multiplier over the nominal
//! capacity. A throttle signal shrinks the multiplier multiplicatively; each
//! success grows it back a little, so recovery is gradual and capacity never
//! exceeds the configured nominal.

use crate::config::{
    BACKOFF_GROW_FACTOR, BACKOFF_MULTIPLIER_MIN, BACKOFF_SHRINK_FACTOR,
};

/// Mutable adaptive state owned by the queue for the life of the instance.
#[derive(Debug, Clone)]
pub(crate) struct AdaptiveState {
    max_requests: u32,
    backoff_multiplier: f64,
    adaptive_max_requests: u32,
}

impl AdaptiveState {
    pub(crate) fn new(max_requests: u32) -> Self {
        AdaptiveState {
            max_requests,
            backoff_multiplier: 1.0,
            adaptive_max_requests: max_requests,
        }
    }

    /// Current effective capacity ceiling. Always in `1..=max_requests`.
    pub(crate) fn adaptive_max_requests(&self) -> u32 {
        self.adaptive_max_requests
    }

    /// Current backoff multiplier, in `[0.25, 1.0]`.
    pub(crate) fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Feeds one completed attempt back into the adaptive state.
    ///
    /// `throttled` is true when the attempt received a "too many requests"
    /// signal. Concurrent in-flight requests each report independently, so a
    /// correlated burst of throttles compounds the shrink (0.75 per report);
    /// this aggressive back-off under correlated load is deliberate.
    pub(crate) fn record_outcome(&mut self, throttled: bool) {
        let previous = self.adaptive_max_requests;
        if throttled {
            self.backoff_multiplier =
                (self.backoff_multiplier * BACKOFF_SHRINK_FACTOR).max(BACKOFF_MULTIPLIER_MIN);
        } else {
            self.backoff_multiplier = (self.backoff_multiplier * BACKOFF_GROW_FACTOR).min(1.0);
        }
        self.adaptive_max_requests = self.effective_capacity();

        if self.adaptive_max_requests < previous {
            log::info!(
                "Adaptive capacity reduced after throttle: {} -> {} (multiplier {:.3})",
                previous,
                self.adaptive_max_requests,
                self.backoff_multiplier
            );
        } else if self.adaptive_max_requests > previous {
            log::debug!(
                "Adaptive capacity recovered: {} -> {} (multiplier {:.3})",
                previous,
                self.adaptive_max_requests,
                self.backoff_multiplier
            );
        }
    }

    fn effective_capacity(&self) -> u32 {
        // floor(max * multiplier), clamped so a small nominal capacity can
        // never adapt itself to zero and wedge the queue.
        let scaled = (f64::from(self.max_requests) * self.backoff_multiplier).floor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = scaled as u32;
        scaled.clamp(1, self.max_requests)
    }
}
