use crate::runtime::current_executor;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Waits until `duration` has elapsed.
///
/// ```rust,ignore
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(Instant::now() + duration)
}

/// Waits until `deadline`. A deadline in the past completes on first poll.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        armed: None,
    }
}

/// Future returned by [`sleep`] and [`sleep_until`].
///
/// The timer is armed on the executor the future is first polled on.
/// Dropping the future disarms it, so an abandoned sleep never wakes
/// its task.
///
/// # Panics
///
/// Polling panics when no executor is current, i.e. outside of a
/// runtime worker and outside of
/// [`LocalExecutor::block_on`](crate::runtime::LocalExecutor::block_on).
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Sleep {
    deadline: Instant,

    /// Cancellation flag of the armed timer.
    armed: Option<Arc<AtomicBool>>,
}

impl Sleep {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if this.is_elapsed() {
            return Poll::Ready(());
        }

        if this.armed.is_none() {
            let executor = current_executor().expect("Sleep polled outside of an executor");
            let cancelled = Arc::new(AtomicBool::new(false));

            executor.set_timer(this.deadline, cx.waker().clone(), cancelled.clone());
            this.armed = Some(cancelled);
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(cancelled) = &self.armed {
            cancelled.store(true, Ordering::Release);
        }
    }
}
