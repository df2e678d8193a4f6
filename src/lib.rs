//! Adaptive rate-limited admission queue for outbound API calls.
//!
//! `throttle_queue` keeps a client inside a per-window request budget
//! (for example "100 requests per minute") while squeezing out as much
//! throughput as the budget allows:
//!
//! - **Sliding window** admission: a request is admitted only when the number
//!   of admissions inside the trailing window is below the capacity ceiling.
//! - **Burst mode**: at low utilization, requests skip inter-admission pacing
//!   entirely so small workloads finish fast.
//! - **Adaptive capacity**: a throttle response (HTTP 429) shrinks the
//!   effective ceiling multiplicatively; successes grow it back a couple of
//!   percent at a time.
//! - **Bounded retries**: each admitted request retries transient failures
//!   with jittered exponential backoff, honoring server retry hints, before
//!   surfacing a terminal error.
//! - **FIFO dispatch**: requests are admitted in enqueue order, but execute
//!   concurrently, so one slow call never blocks admission of the next.
//!
//! # Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use throttle_queue::{CallError, RequestQueue};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = RequestQueue::new(100, Duration::from_secs(60))?;
//!
//! let handle = queue
//!     .enqueue(|| async {
//!         reqwest::get("https://api.example.com/items")
//!             .await
//!             .map_err(CallError::from)?
//!             .error_for_status()
//!             .map_err(CallError::from)?
//!             .text()
//!             .await
//!             .map_err(CallError::from)
//!     })
//!     .await;
//!
//! let items = handle.await?;
//! println!("got {} bytes", items.len());
//!
//! let status = queue.status().await;
//! log::info!(
//!     "window {}/{} (adaptive {}), {} queued",
//!     status.window_occupancy,
//!     status.max_requests,
//!     status.adaptive_max_requests,
//!     status.queue_depth
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod adaptive;
mod admission;
mod config;
mod error_handling;
mod queue;
mod status;
mod window;


pub use config::{QueueConfig, RetryConfig};
pub use error_handling::{CallError, QueueError, TriggerKind};
pub use queue::{CallHandle, RequestQueue};
pub use status::{RateLimitStatus, RetryStatsSnapshot};
