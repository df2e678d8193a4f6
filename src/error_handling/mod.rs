//! Error handling and retry statistics.
//!
//! This module provides:
//! - The attempt-level and terminal error types
//! - Retryability classification (status set, transient kinds, throttle
//!   message detection) and the `reqwest::Error` bridge
//! - Cumulative retry statistics

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::TriggerKind;
pub use types::{CallError, QueueError};

pub(crate) use categorization::{classify, RetryTrigger};
pub(crate) use stats::RetryStats;
