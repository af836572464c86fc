//! Wait-queue protocol shared by [`CoMutex`](super::CoMutex) and
//! [`CoSemaphore`](super::CoSemaphore).
//!
//! Both primitives are "a counter plus a queue of wake-up tokens". They
//! differ only in how a unit of the resource is taken and given back, which
//! is what [`Permits`] captures. The queueing, hand-off and suspension
//! logic lives here once.

use crate::queue::LockFreeQueue;
use crate::runtime::{Schedule, current_executor};
use crate::sync::wake_up::WakeUp;

use parking_lot::Mutex;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};
use std::task::{Context, Poll, Waker};
use std::time::Instant;

/// A resource handed out one unit at a time.
pub(crate) trait Permits: Sync {
    /// Takes one unit without suspending.
    fn try_take(&self) -> bool;

    /// Returns one unit, handing it to a live waiter when there is one.
    fn give_back(&self);

    /// Tokens of the suspended acquirers, in arrival order.
    fn waiters(&self) -> &LockFreeQueue<Arc<WakeUp>>;
}

/// Queues `token` as a waiter of `permits`.
///
/// The fast path is retried after the token is visible in the queue: a
/// release that ran between the caller's failed attempt and the enqueue
/// may have found the queue empty. If the retry succeeds the token is
/// completed here, with `notify` selecting whether its handler is still
/// posted. When the token was already completed by its timer, the unit
/// goes straight back.
pub(crate) fn enqueue_waiter<P>(permits: &P, token: &Arc<WakeUp>, notify: bool)
where
    P: Permits + ?Sized,
{
    permits.waiters().enqueue(token.clone());
    fence(Ordering::SeqCst);

    tracing::trace!("waiter queued");

    if permits.try_take() {
        let won = if notify { token.call(true) } else { token.claim() };

        if !won {
            permits.give_back();
        }
    }
}

/// Hands one unit to the first live waiter.
///
/// Tokens that were completed by their timer or abandoned by their future
/// are discarded on the way. This is the only place they leave the queue. Returns `false` when no live waiter was found,
/// in which case the unit still belongs to the caller.
pub(crate) fn hand_off(waiters: &LockFreeQueue<Arc<WakeUp>>) -> bool {
    while let Some(token) = waiters.dequeue() {
        if token.call(true) {
            tracing::trace!("ownership handed off");
            return true;
        }

        tracing::debug!(?token, "skipping stale wake-up token");
    }

    false
}

/// Counts the waiters that are still pending, emptying the queue.
pub(crate) fn drain_live(waiters: &LockFreeQueue<Arc<WakeUp>>) -> usize {
    let mut live = 0;

    while let Some(token) = waiters.dequeue() {
        if !token.is_finished() {
            live += 1;
        }
    }

    live
}

/// Starts a callback-style acquisition.
///
/// `handler` is posted onto `executor` even when the unit is available
/// right away.
pub(crate) fn acquire_with<P, F>(
    permits: &P,
    executor: Arc<dyn Schedule>,
    deadline: Option<Instant>,
    handler: F,
) where
    P: Permits + ?Sized,
    F: FnOnce(bool) + Send + 'static,
{
    let token = WakeUp::new(executor, handler);

    if permits.try_take() {
        token.call(true);
        return;
    }

    enqueue_waiter(permits, &token, true);

    if let Some(deadline) = deadline {
        token.start_timer_until(deadline);
    }
}

enum State {
    Idle,
    Waiting {
        token: Arc<WakeUp>,
        waker: Arc<Mutex<Option<Waker>>>,
    },
    Done,
}

/// Future of a suspending acquisition, resolving to whether a unit was
/// obtained before the optional deadline.
///
/// Dropping it while queued abandons its token. If ownership was already
/// handed over, the unit is given back.
pub(crate) struct Wait<'a, P: Permits + ?Sized> {
    permits: &'a P,
    executor: Option<Arc<dyn Schedule>>,
    deadline: Option<Instant>,
    state: State,
}

impl<'a, P: Permits + ?Sized> Wait<'a, P> {
    pub(crate) fn new(
        permits: &'a P,
        executor: Option<Arc<dyn Schedule>>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            permits,
            executor,
            deadline,
            state: State::Idle,
        }
    }

    /// Queues a token whose handler wakes the task polling this future.
    fn register(&mut self, cx: &Context<'_>) {
        let executor = self.executor.take().unwrap_or_else(|| {
            current_executor().expect("suspending acquisition requires a running executor")
        });

        let waker = Arc::new(Mutex::new(Some(cx.waker().clone())));
        let slot = waker.clone();
        let token = WakeUp::new(executor, move |_| {
            // Released before waking: the waker may poll the future inline,
            // and polling stores a fresh waker into this slot.
            let waker = slot.lock().take();
            if let Some(waker) = waker {
                waker.wake();
            }
        });

        enqueue_waiter(self.permits, &token, false);

        if let Some(deadline) = self.deadline {
            token.start_timer_until(deadline);
        }

        self.state = State::Waiting { token, waker };
    }
}

impl<P: Permits + ?Sized> Future for Wait<'_, P> {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let this = self.get_mut();

        if let State::Idle = this.state {
            if this.permits.try_take() {
                this.state = State::Done;
                return Poll::Ready(true);
            }

            if this.deadline.is_some_and(|d| Instant::now() >= d) {
                this.state = State::Done;
                return Poll::Ready(false);
            }

            this.register(cx);
        }

        let State::Waiting { token, waker } = &this.state else {
            panic!("acquisition future polled after completion");
        };

        *waker.lock() = Some(cx.waker().clone());

        match token.outcome() {
            Some(acquired) => {
                this.state = State::Done;
                Poll::Ready(acquired)
            }
            None => Poll::Pending,
        }
    }
}

impl<P: Permits + ?Sized> Drop for Wait<'_, P> {
    fn drop(&mut self) {
        if let State::Waiting { token, .. } = &self.state
            && !token.abandon()
            && token.outcome() == Some(true)
        {
            self.permits.give_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Permits;
    use crate::runtime::{LocalExecutor, Schedule};
    use crate::sync::CoMutex;

    use parking_lot::Mutex;

    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Wake, Waker};

    type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    /// A task whose waker polls it on the spot.
    struct InlineTask {
        future: Mutex<Option<BoxedFuture>>,
        done: AtomicBool,
    }

    impl InlineTask {
        fn poll(self: &Arc<Self>) {
            let waker = Waker::from(self.clone());
            let mut cx = Context::from_waker(&waker);
            let mut slot = self.future.lock();

            if let Some(future) = slot.as_mut()
                && future.as_mut().poll(&mut cx).is_ready()
            {
                *slot = None;
                self.done.store(true, Ordering::SeqCst);
            }
        }
    }

    impl Wake for InlineTask {
        fn wake(self: Arc<Self>) {
            self.poll();
        }
    }

    #[test]
    fn test_waker_may_poll_inline_from_the_handler() {
        let executor = LocalExecutor::new();
        let mutex = Arc::new(CoMutex::new());
        assert!(mutex.try_lock());

        let m = mutex.clone();
        let on: Arc<dyn Schedule> = executor.clone();
        let task = Arc::new(InlineTask {
            future: Mutex::new(Some(Box::pin(async move { m.lock_on(on).await }))),
            done: AtomicBool::new(false),
        });

        task.poll();
        assert!(!task.done.load(Ordering::SeqCst));

        // The handler wakes the task, which re-polls and stores a new waker
        // into the slot the handler just emptied.
        mutex.unlock().unwrap();
        executor.run_until_idle();

        assert!(task.done.load(Ordering::SeqCst));
        mutex.unlock().unwrap();
    }

    #[test]
    fn test_stale_tokens_are_swept_by_the_next_release() {
        let executor = LocalExecutor::new();
        let mutex = CoMutex::new();
        assert!(mutex.try_lock());

        let timed_out = executor.block_on(async {
            let mut timed_out = 0;
            for _ in 0..20 {
                if !mutex.try_lock_for(std::time::Duration::from_millis(1)).await {
                    timed_out += 1;
                }
            }
            timed_out
        });

        assert_eq!(timed_out, 20);
        assert!(!mutex.waiters().is_empty());

        mutex.unlock().unwrap();

        assert!(mutex.waiters().is_empty());
        assert!(!mutex.is_locked());
    }
}
