//! Retry statistics tracking.

use std::collections::HashMap;
use strum::IntoEnumIterator;

use super::categorization::{RetryTrigger, TriggerKind};

/// Cumulative retry counters for the life of a queue instance.
///
/// Counts every scheduled retry: in total, grouped by triggering HTTP status
/// code, and grouped by trigger category. All kind counters are initialized to
/// zero on creation so snapshots always expose the full set of categories.
/// Access is serialized through the queue's state lock.
#[derive(Debug)]
pub(crate) struct RetryStats {
    total: u64,
    by_status: HashMap<u16, u64>,
    by_kind: HashMap<TriggerKind, u64>,
}

impl RetryStats {
    pub(crate) fn new() -> Self {
        let mut by_kind = HashMap::new();
        for kind in TriggerKind::iter() {
            by_kind.insert(kind, 0);
        }
        RetryStats {
            total: 0,
            by_status: HashMap::new(),
            by_kind,
        }
    }

    /// Records one scheduled retry.
    pub(crate) fn record(&mut self, trigger: &RetryTrigger) {
        self.total += 1;
        if let Some(status) = trigger.status {
            *self.by_status.entry(status).or_insert(0) += 1;
        }
        *self.by_kind.entry(trigger.kind).or_insert(0) += 1;
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn by_status(&self) -> &HashMap<u16, u64> {
        &self.by_status
    }

    pub(crate) fn by_kind(&self) -> &HashMap<TriggerKind, u64> {
        &self.by_kind
    }
}
