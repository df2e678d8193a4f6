//! The request queue: enqueue, status, shutdown.
//!
//! A [`RequestQueue`] owns the sliding admission window, the adaptive
//! capacity state, and a FIFO of pending work. A single cooperative dispatch
//! loop (spawned lazily whenever the queue goes non-empty) admits work
//! against the window and hands each admitted request to an independent
//! retry task, so admission pacing is never blocked by slow requests.

mod dispatch;
mod executor;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::adaptive::AdaptiveState;
use crate::admission;
use crate::config::QueueConfig;
use crate::error_handling::{CallError, QueueError, RetryStats};
use crate::status::{RateLimitStatus, RetryStatsSnapshot};
use crate::window::AdmissionWindow;

/// A queued unit of work, type-erased. The closure owns the caller's work
/// and the delivery channel; invoking it with the shared core runs the full
/// attempt/retry state machine.
type Job = Box<dyn FnOnce(Arc<QueueCore>) -> BoxFuture<'static, ()> + Send + 'static>;

pub(crate) struct QueuedRequest {
    job: Job,
}

impl QueuedRequest {
    pub(crate) fn into_task(self, core: Arc<QueueCore>) -> BoxFuture<'static, ()> {
        (self.job)(core)
    }
}

/// State shared between the queue handle, the dispatch loop, and in-flight
/// retry tasks.
pub(crate) struct QueueCore {
    pub(crate) config: QueueConfig,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) completed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) shutdown: CancellationToken,
}

/// Mutable state behind the lock. The lock is only ever held across
/// synchronous decision points, never across a sleep.
pub(crate) struct Inner {
    pub(crate) queue: VecDeque<QueuedRequest>,
    pub(crate) window: AdmissionWindow,
    pub(crate) adaptive: AdaptiveState,
    pub(crate) retry_stats: RetryStats,
    pub(crate) loop_running: bool,
}

/// Adaptive rate-limited admission queue for outbound API calls.
///
/// Requests are admitted in FIFO order against a sliding time window, with
/// opportunistic bursts for small workloads, an adaptive capacity ceiling
/// that shrinks on throttling and recovers gradually, and bounded jittered
/// retries per request. Cloning is cheap and all clones share one limiter.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use throttle_queue::{CallError, RequestQueue};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = RequestQueue::new(100, Duration::from_secs(60))?;
///
/// let handle = queue
///     .enqueue(|| async {
///         let body = reqwest::get("https://api.example.com/records")
///             .await
///             .map_err(CallError::from)?
///             .error_for_status()
///             .map_err(CallError::from)?
///             .text()
///             .await
///             .map_err(CallError::from)?;
///         Ok(body)
///     })
///     .await;
///
/// let body = handle.await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestQueue {
    core: Arc<QueueCore>,
}

impl RequestQueue {
    /// Creates a queue with the given nominal capacity per sliding window and
    /// default burst, pacing, and retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] when `max_requests` is zero or
    /// `window` is zero.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, QueueError> {
        Self::with_config(QueueConfig::new(max_requests, window))
    }

    /// Creates a queue from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn with_config(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        let inner = Inner {
            queue: VecDeque::new(),
            window: AdmissionWindow::new(config.window),
            adaptive: AdaptiveState::new(config.max_requests),
            retry_stats: RetryStats::new(),
            loop_running: false,
        };
        Ok(RequestQueue {
            core: Arc::new(QueueCore {
                config,
                inner: Mutex::new(inner),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Submits one unit of work.
    ///
    /// `work` is called once per attempt and must produce a fresh future each
    /// time; the queue retries retryable failures up to the configured budget.
    /// Registration is complete when this method's future resolves, so
    /// sequential `enqueue(..).await` calls are admitted in that order. The
    /// returned [`CallHandle`] resolves exactly once with the terminal
    /// outcome; dropping it does not cancel the request.
    pub async fn enqueue<T, F, Fut>(&self, work: F) -> CallHandle<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CallError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let mut inner = self.core.inner.lock().await;
        if self.core.shutdown.is_cancelled() {
            drop(inner);
            let _ = tx.send(Err(QueueError::Closed));
            return CallHandle { rx };
        }

        let job: Job = Box::new(move |core| executor::run_attempts(core, work, tx).boxed());
        inner.queue.push_back(QueuedRequest { job });

        if !inner.loop_running {
            inner.loop_running = true;
            tokio::spawn(dispatch::dispatch_loop(Arc::clone(&self.core)));
        }
        drop(inner);

        CallHandle { rx }
    }

    /// Returns a point-in-time snapshot of the queue.
    ///
    /// Safe to call at any time; the only state it touches is a fresh prune of
    /// the admission window.
    pub async fn status(&self) -> RateLimitStatus {
        let mut inner = self.core.inner.lock().await;
        let now = Instant::now();
        inner.window.prune(now);

        let occupancy = inner.window.len();
        let queue_depth = inner.queue.len();
        let adaptive_max = inner.adaptive.adaptive_max_requests();

        RateLimitStatus {
            queue_depth,
            window_occupancy: occupancy,
            max_requests: self.core.config.max_requests,
            adaptive_max_requests: adaptive_max,
            can_admit: admission::can_admit(occupancy, &inner.adaptive),
            next_slot_in: inner.window.time_until_next_slot(now),
            burst_eligible: admission::should_burst(
                occupancy,
                queue_depth,
                &inner.adaptive,
                &self.core.config,
            ),
            utilization: occupancy as f64 / f64::from(adaptive_max),
            window_reset_in: inner.window.time_until_reset(now),
            backoff_multiplier: inner.adaptive.backoff_multiplier(),
            completed: self.core.completed.load(Ordering::SeqCst),
            failed: self.core.failed.load(Ordering::SeqCst),
            retries: RetryStatsSnapshot::from_stats(&inner.retry_stats),
        }
    }

    /// Shuts the queue down.
    ///
    /// Still-queued requests resolve with [`QueueError::Closed`]; requests
    /// already admitted run to completion. Subsequent `enqueue` calls resolve
    /// with [`QueueError::Closed`] immediately.
    pub async fn shutdown(&self) {
        let mut inner = self.core.inner.lock().await;
        self.core.shutdown.cancel();
        let dropped = inner.queue.len();
        // Dropping a queued request drops its delivery channel, which the
        // caller's handle observes as Closed.
        inner.queue.clear();
        drop(inner);
        if dropped > 0 {
            log::info!("Queue shut down with {dropped} requests still pending");
        } else {
            log::debug!("Queue shut down");
        }
    }
}

/// Handle to an enqueued request's eventual outcome.
///
/// Resolves exactly once with the work's result, the terminal retry error, or
/// [`QueueError::Closed`] if the queue shut down first.
#[derive(Debug)]
pub struct CallHandle<T> {
    rx: oneshot::Receiver<Result<T, QueueError>>,
}

impl<T> Future for CallHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or_else(|_| Err(QueueError::Closed)))
    }
}
