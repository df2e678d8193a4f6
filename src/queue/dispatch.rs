//! The dispatch loop.
//!
//! One loop instance runs while the queue is non-empty. Each iteration takes
//! the state lock just long enough to make an admission decision, then sleeps
//! outside the lock. Admitted requests are spawned as independent tasks so a
//! slow or retrying request never stalls admission of the next one.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{QueueCore, QueuedRequest};
use crate::admission;

enum Step {
    /// Run this request now, then pace by the given delay.
    Dispatch(QueuedRequest, Duration),
    /// No slot free; re-check after the delay.
    Wait(Duration),
    /// Queue drained; the loop may exit.
    Idle,
}

pub(super) async fn dispatch_loop(core: Arc<QueueCore>) {
    log::debug!("Dispatch loop started");
    loop {
        let step = {
            let mut inner = core.inner.lock().await;
            let now = Instant::now();
            inner.window.prune(now);

            if inner.queue.is_empty() {
                inner.loop_running = false;
                Step::Idle
            } else {
                // Occupancy before recording this admission; depth after
                // popping, so pacing reflects the work still waiting.
                let occupancy = inner.window.len();
                if admission::can_admit(occupancy, &inner.adaptive) {
                    match inner.queue.pop_front() {
                        Some(request) => {
                            let delay = admission::next_delay(
                                occupancy,
                                inner.queue.len(),
                                &inner.adaptive,
                                &core.config,
                            );
                            inner.window.record(now);
                            Step::Dispatch(request, delay)
                        }
                        None => {
                            inner.loop_running = false;
                            Step::Idle
                        }
                    }
                } else {
                    Step::Wait(admission::wait_until_admissible(&inner.window, now))
                }
            }
        };

        match step {
            Step::Dispatch(request, delay) => {
                tokio::spawn(request.into_task(Arc::clone(&core)));
                if !delay.is_zero() && !pace(&core, delay).await {
                    return;
                }
            }
            Step::Wait(delay) => {
                log::debug!("Window full, dispatch suspended for {delay:?}");
                if !pace(&core, delay).await {
                    return;
                }
            }
            Step::Idle => {
                log::debug!("Queue drained, dispatch loop exiting");
                return;
            }
        }
    }
}

/// Sleeps for `delay` unless the queue shuts down first. Returns false on
/// shutdown, after clearing the running flag so a later enqueue (which will
/// observe the cancelled token) cannot wedge.
async fn pace(core: &Arc<QueueCore>, delay: Duration) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        () = core.shutdown.cancelled() => {
            let mut inner = core.inner.lock().await;
            inner.loop_running = false;
            false
        }
    }
}
