//! Point-in-time queue status snapshots.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error_handling::RetryStats;

/// Snapshot of the queue's admission state and cumulative counters.
///
/// Computed on demand by [`status`](crate::RequestQueue::status) after a fresh
/// prune; never stored. Serializable for status endpoints and logs.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Number of requests waiting for admission.
    pub queue_depth: usize,
    /// Admissions currently inside the sliding window.
    pub window_occupancy: usize,
    /// Nominal configured capacity per window.
    pub max_requests: u32,
    /// Current effective capacity ceiling (adaptive, at most `max_requests`).
    pub adaptive_max_requests: u32,
    /// Whether a request could be admitted right now.
    pub can_admit: bool,
    /// Time until the oldest window entry expires and frees a slot.
    /// `None` when the window is empty.
    pub next_slot_in: Option<Duration>,
    /// Whether the next admission would run in burst mode.
    pub burst_eligible: bool,
    /// Window occupancy as a fraction of the adaptive ceiling.
    pub utilization: f64,
    /// Time until the newest window entry expires and the window is empty.
    /// `None` when the window is already empty.
    pub window_reset_in: Option<Duration>,
    /// Current adaptive backoff multiplier, in `[0.25, 1.0]`.
    pub backoff_multiplier: f64,
    /// Requests resolved successfully since construction.
    pub completed: u64,
    /// Requests that terminated with an error since construction.
    pub failed: u64,
    /// Cumulative retry counters.
    pub retries: RetryStatsSnapshot,
}

/// Cumulative retry counters: total, per HTTP status, and per trigger
/// category.
#[derive(Debug, Clone, Serialize)]
pub struct RetryStatsSnapshot {
    /// Total retries scheduled since construction.
    pub total: u64,
    /// Retries grouped by triggering HTTP status code.
    pub by_status: BTreeMap<u16, u64>,
    /// Retries grouped by trigger category (throttled, server error, timeout,
    /// connection).
    pub by_kind: BTreeMap<String, u64>,
}

impl RetryStatsSnapshot {
    pub(crate) fn from_stats(stats: &RetryStats) -> Self {
        RetryStatsSnapshot {
            total: stats.total(),
            by_status: stats.by_status().iter().map(|(k, v)| (*k, *v)).collect(),
            by_kind: stats
                .by_kind()
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), *v))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = RetryStatsSnapshot {
            total: 3,
            by_status: [(429u16, 2u64), (503, 1)].into_iter().collect(),
            by_kind: [("throttled".to_string(), 2u64)].into_iter().collect(),
        };
        let status = RateLimitStatus {
            queue_depth: 1,
            window_occupancy: 2,
            max_requests: 10,
            adaptive_max_requests: 7,
            can_admit: true,
            next_slot_in: Some(Duration::from_millis(250)),
            burst_eligible: false,
            utilization: 2.0 / 7.0,
            window_reset_in: Some(Duration::from_secs(1)),
            backoff_multiplier: 0.75,
            completed: 5,
            failed: 1,
            retries: snapshot,
        };

        let json = serde_json::to_value(&status).expect("status should serialize");
        assert_eq!(json["adaptive_max_requests"], 7);
        assert_eq!(json["retries"]["total"], 3);
        assert_eq!(json["retries"]["by_status"]["429"], 2);
    }
}
