use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicBool};
use std::task::Waker;
use std::time::Instant;

/// One armed timer.
///
/// Entries compare by deadline only, reversed, so that the max-heap
/// `BinaryHeap` pops the earliest deadline first.
pub(crate) struct TimerEntry {
    pub(crate) deadline: Instant,
    pub(crate) waker: Waker,

    /// Set by the owner to disarm the timer; checked when it expires.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Heap size below which cancelled entries are left for `expire`.
const SWEEP_FLOOR: usize = 64;

/// Deadline-ordered set of pending timers.
///
/// Shared by the reactor thread and the single-threaded
/// [`LocalExecutor`](crate::runtime::LocalExecutor).
///
/// Cancelling only sets a flag, so a disarmed entry would otherwise sit in
/// the heap until its deadline. Pushes sweep those entries out whenever
/// the heap has doubled since the last sweep.
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    sweep_at: usize,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            sweep_at: SWEEP_FLOOR,
        }
    }
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: TimerEntry) {
        self.heap.push(entry);

        if self.heap.len() >= self.sweep_at {
            self.sweep();
        }
    }

    /// Drops every cancelled entry, whatever its deadline.
    fn sweep(&mut self) {
        let before = self.heap.len();
        self.heap.retain(|t| !t.cancelled.load(atomic::Ordering::Acquire));

        self.sweep_at = (self.heap.len() * 2).max(SWEEP_FLOOR);
        tracing::trace!(
            swept = before - self.heap.len(),
            pending = self.heap.len(),
            "cancelled timers swept"
        );
    }

    /// Earliest pending deadline, cancelled entries included.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|t| t.deadline)
    }

    /// Removes every entry whose deadline is at or before `now` and
    /// returns the wakers of those that were not cancelled.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Waker> {
        let mut fired = Vec::new();

        while let Some(timer) = self.heap.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.heap.pop() else {
                break;
            };

            if timer.cancelled.load(atomic::Ordering::Acquire) {
                continue;
            }

            fired.push(timer.waker);
        }

        fired
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
