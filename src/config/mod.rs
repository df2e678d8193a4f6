//! Queue configuration and constants.
//!
//! This module provides:
//! - Tuning constants (burst thresholds, backoff bounds, retry defaults)
//! - The [`QueueConfig`] and [`RetryConfig`] types and their validation

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{QueueConfig, RetryConfig};
