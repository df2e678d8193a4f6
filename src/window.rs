//! Sliding window of admission timestamps.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Ordered record of recent admission timestamps, oldest first.
///
/// Timestamps are inserted in non-decreasing order, so pruning entries that
/// have aged out of the window is a prefix trim. The window holds plain
/// bookkeeping only; callers serialize access through the queue's state lock.
#[derive(Debug)]
pub(crate) struct AdmissionWindow {
    entries: VecDeque<Instant>,
    window: Duration,
}

impl AdmissionWindow {
    pub(crate) fn new(window: Duration) -> Self {
        AdmissionWindow {
            entries: VecDeque::new(),
            window,
        }
    }

    /// Removes all timestamps older than `now - window` from the front.
    pub(crate) fn prune(&mut self, now: Instant) {
        while let Some(front) = self.entries.front() {
            if now.duration_since(*front) > self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records an admission at `now`.
    pub(crate) fn record(&mut self, now: Instant) {
        self.entries.push_back(now);
    }

    /// Current occupancy.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Time until the oldest entry ages out, freeing one slot.
    ///
    /// Returns `None` when the window is empty (a slot is already free).
    pub(crate) fn time_until_next_slot(&self, now: Instant) -> Option<Duration> {
        self.entries.front().map(|oldest| {
            let age = now.duration_since(*oldest);
            self.window.saturating_sub(age)
        })
    }

    /// Time until the newest entry ages out and the window is fully reset.
    ///
    /// Returns `None` when the window is empty.
    pub(crate) fn time_until_reset(&self, now: Instant) -> Option<Duration> {
        self.entries.back().map(|newest| {
            let age = now.duration_since(*newest);
            self.window.saturating_sub(age)
        })
    }
}
