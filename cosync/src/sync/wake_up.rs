//! One-shot wake-up tokens.
//!
//! A [`WakeUp`] pairs the continuation of a suspended acquisition with the
//! executor it must resume on. The token is completed exactly once, either
//! by a hand-off from the releasing side or by its timer; the loser of that
//! race is a no-op.

use crate::runtime::Schedule;

use parking_lot::Mutex;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Wake, Waker};
use std::time::{Duration, Instant};

const PENDING: u8 = 0;
const ACQUIRED: u8 = 1;
const TIMED_OUT: u8 = 2;
const ABANDONED: u8 = 3;

/// Continuation invoked with `true` on acquisition and `false` on timeout.
pub type Handler = Box<dyn FnOnce(bool) + Send + 'static>;

/// A one-shot continuation bound to an executor.
///
/// The handler never runs on the stack of whoever completes the token; it
/// is always posted onto the token's executor.
pub struct WakeUp {
    state: AtomicU8,
    executor: Arc<dyn Schedule>,

    /// Taken once by whoever moves `state` out of `PENDING`.
    handler: Mutex<Option<Handler>>,

    /// Cancellation flag shared with the timer, if one is armed.
    timer_cancelled: Arc<AtomicBool>,
}

impl WakeUp {
    /// Creates a pending token that will run `handler` on `executor`.
    pub fn new<F>(executor: Arc<dyn Schedule>, handler: F) -> Arc<Self>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        Arc::new(Self {
            state: AtomicU8::new(PENDING),
            executor,
            handler: Mutex::new(Some(Box::new(handler))),
            timer_cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Delivers the outcome of the acquisition.
    ///
    /// Only the first completion wins: it cancels the timer and posts the
    /// handler with `acquired`. Returns whether this call won.
    pub fn call(&self, acquired: bool) -> bool {
        let outcome = if acquired { ACQUIRED } else { TIMED_OUT };

        if !self.finish(outcome) {
            return false;
        }

        // The slot guard must be gone before `post`, which may run the job.
        let handler = self.handler.lock().take();
        if let Some(handler) = handler {
            self.executor.post(Box::new(move || handler(acquired)));
        }

        true
    }

    /// Arms a timer that completes the token with `false` after `duration`.
    pub fn start_timer(self: &Arc<Self>, duration: Duration) {
        self.start_timer_until(Instant::now() + duration);
    }

    /// Arms a timer that completes the token with `false` at `deadline`.
    ///
    /// Has no effect on a token that is already finished.
    pub fn start_timer_until(self: &Arc<Self>, deadline: Instant) {
        if self.is_finished() {
            return;
        }

        let expiry = Waker::from(Arc::new(Expiry(Arc::downgrade(self))));
        self.executor
            .set_timer(deadline, expiry, self.timer_cancelled.clone());
    }

    /// Returns `true` once the token has been completed or abandoned.
    pub fn is_finished(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }

    /// `Some(true)` if acquired, `Some(false)` if timed out, `None` while
    /// pending or after being abandoned.
    pub fn outcome(&self) -> Option<bool> {
        match self.state.load(Ordering::Acquire) {
            ACQUIRED => Some(true),
            TIMED_OUT => Some(false),
            _ => None,
        }
    }

    /// Completes a pending token as acquired without posting its handler.
    ///
    /// Used by a waiter that took the resource itself right after queueing,
    /// while it is still running and needs no wake-up.
    pub(crate) fn claim(&self) -> bool {
        if !self.finish(ACQUIRED) {
            return false;
        }

        let handler = self.handler.lock().take();
        drop(handler);
        true
    }

    /// Makes a pending token inert without running its handler.
    ///
    /// Used when the waiting side goes away. Returns `false` if the token
    /// was already completed, in which case the caller must honor the
    /// outcome (for instance by releasing ownership it was handed).
    pub(crate) fn abandon(&self) -> bool {
        if !self.finish(ABANDONED) {
            return false;
        }

        let handler = self.handler.lock().take();
        drop(handler);
        true
    }

    fn finish(&self, outcome: u8) -> bool {
        let won = self
            .state
            .compare_exchange(PENDING, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if won {
            self.timer_cancelled.store(true, Ordering::Release);
        }

        won
    }
}

impl fmt::Debug for WakeUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.load(Ordering::Acquire) {
            PENDING => "pending",
            ACQUIRED => "acquired",
            TIMED_OUT => "timed_out",
            _ => "abandoned",
        };

        f.debug_struct("WakeUp").field("state", &state).finish()
    }
}

/// Timer waker of a token.
///
/// Holds a weak reference so that a cancelled timer sitting in a timer
/// queue does not keep the token and its handler alive.
struct Expiry(Weak<WakeUp>);

impl Wake for Expiry {
    fn wake(self: Arc<Self>) {
        if let Some(token) = self.0.upgrade()
            && token.call(false)
        {
            tracing::trace!("acquisition timed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LocalExecutor;

    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn recording(
        executor: &Arc<LocalExecutor>,
    ) -> (Arc<WakeUp>, Arc<parking_lot::Mutex<Vec<bool>>>) {
        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let r = results.clone();
        let token = WakeUp::new(executor.clone(), move |ok| r.lock().push(ok));

        (token, results)
    }

    #[test]
    fn test_handler_is_posted_not_called_inline() {
        let executor = LocalExecutor::new();
        let (token, results) = recording(&executor);

        assert!(token.call(true));
        assert!(results.lock().is_empty());

        executor.run_until_idle();
        assert_eq!(*results.lock(), vec![true]);
        assert_eq!(token.outcome(), Some(true));
    }

    #[test]
    fn test_second_delivery_is_noop() {
        let executor = LocalExecutor::new();
        let (token, results) = recording(&executor);

        assert!(token.call(false));
        assert!(!token.call(true));
        assert!(!token.call(false));

        executor.run_until_idle();
        assert_eq!(*results.lock(), vec![false]);
        assert_eq!(token.outcome(), Some(false));
    }

    #[test]
    fn test_abandon_drops_handler() {
        let executor = LocalExecutor::new();
        let (token, results) = recording(&executor);

        assert!(token.abandon());
        assert!(token.is_finished());
        assert_eq!(token.outcome(), None);
        assert!(!token.call(true));

        assert_eq!(executor.run_until_idle(), 0);
        assert!(results.lock().is_empty());
    }

    #[test]
    fn test_abandon_after_completion_fails() {
        let executor = LocalExecutor::new();
        let (token, _results) = recording(&executor);

        assert!(token.call(true));
        assert!(!token.abandon());
        assert_eq!(token.outcome(), Some(true));
    }

    #[test]
    fn test_claim_skips_handler() {
        let executor = LocalExecutor::new();
        let (token, results) = recording(&executor);

        assert!(token.claim());
        assert!(!token.call(false));
        assert_eq!(token.outcome(), Some(true));

        assert_eq!(executor.run_until_idle(), 0);
        assert!(results.lock().is_empty());
    }

    #[test]
    fn test_timer_completes_with_false() {
        let executor = LocalExecutor::new();
        let (token, results) = recording(&executor);

        token.start_timer(Duration::from_millis(10));
        executor.run_until(Instant::now() + Duration::from_millis(50));

        assert_eq!(*results.lock(), vec![false]);
        assert_eq!(token.outcome(), Some(false));
    }

    #[test]
    fn test_success_cancels_timer() {
        let executor = LocalExecutor::new();
        let (token, results) = recording(&executor);

        token.start_timer(Duration::from_millis(10));
        assert!(token.call(true));

        executor.run_until(Instant::now() + Duration::from_millis(40));
        assert_eq!(*results.lock(), vec![true]);
    }

    #[test]
    fn test_concurrent_delivery_has_single_winner() {
        for _ in 0..100 {
            let executor = LocalExecutor::new();
            let delivered = Arc::new(AtomicUsize::new(0));
            let d = delivered.clone();
            let token = WakeUp::new(executor.clone(), move |_| {
                d.fetch_add(1, Ordering::SeqCst);
            });

            let racers: Vec<_> = [true, false, true, false]
                .into_iter()
                .map(|ok| {
                    let token = token.clone();
                    thread::spawn(move || token.call(ok))
                })
                .collect();

            let winners = racers
                .into_iter()
                .map(|r| r.join().unwrap())
                .filter(|won| *won)
                .count();

            executor.run_until_idle();
            assert_eq!(winners, 1);
            assert_eq!(delivered.load(Ordering::SeqCst), 1);
        }
    }
}
