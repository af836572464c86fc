//! Lock-free multi-producer, multi-consumer FIFO queue.
//!
//! [`LockFreeQueue`] is a Michael & Scott non-blocking queue. It is the
//! building block for the wait queues of [`CoMutex`](crate::sync::CoMutex)
//! and [`CoSemaphore`](crate::sync::CoSemaphore), and for the runtime's
//! global task injector.
//!
//! ## Design notes
//!
//! - The list always starts with a dummy node. Values live in the nodes
//!   reachable from `head.next`.
//! - `tail` may lag behind the real last node while an insertion is in
//!   flight. Any thread that notices the lag swings it forward.
//! - Retired nodes are handed to `crossbeam::epoch` and freed only once no
//!   pinned thread can still observe them. This rules out use-after-free
//!   and the ABA problem on `head`.

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam::utils::CachePadded;

use std::mem::MaybeUninit;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

/// A node of the linked list.
///
/// The value slot is uninitialized for the dummy node. A node becomes the
/// dummy at the moment its value is moved out by a successful dequeue.
struct Node<T> {
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn dummy() -> Self {
        Self {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn with_value(value: T) -> Self {
        Self {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        }
    }
}

/// A lock-free FIFO queue.
///
/// Every operation is safe to call concurrently from any number of
/// threads. Neither [`enqueue`](Self::enqueue) nor
/// [`dequeue`](Self::dequeue) ever blocks.
///
/// # Examples
///
/// ```rust
/// use cosync::queue::LockFreeQueue;
///
/// let queue = LockFreeQueue::new();
/// queue.enqueue(1);
/// queue.enqueue(2);
///
/// assert_eq!(queue.dequeue(), Some(1));
/// assert_eq!(queue.dequeue(), Some(2));
/// assert_eq!(queue.dequeue(), None);
/// ```
pub struct LockFreeQueue<T> {
    /// Points to the dummy node.
    head: CachePadded<Atomic<Node<T>>>,

    /// Points to the last node, or lags behind it by in-flight insertions.
    tail: CachePadded<Atomic<Node<T>>>,
}

// Safety: values are moved in by one thread and moved out by exactly one
// dequeuer (the winner of the `head` CAS), so `T: Send` is sufficient.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T> LockFreeQueue<T> {
    /// Creates an empty queue holding only the dummy node.
    pub fn new() -> Self {
        let queue = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
        };

        // Safety: the queue is not shared yet.
        let guard = unsafe { epoch::unprotected() };
        let dummy = Owned::new(Node::dummy()).into_shared(guard);

        queue.head.store(dummy, Relaxed);
        queue.tail.store(dummy, Relaxed);

        queue
    }

    /// Appends `value` at the tail of the queue.
    pub fn enqueue(&self, value: T) {
        let guard = epoch::pin();
        let node = Owned::new(Node::with_value(value)).into_shared(&guard);

        loop {
            let tail = self.tail.load(Acquire, &guard);
            if self.link_after(tail, node, &guard) {
                return;
            }
        }
    }

    /// Constructs the value with `make` and appends it at the tail.
    ///
    /// The value is built directly into the freshly allocated node.
    pub fn enqueue_with<F>(&self, make: F)
    where
        F: FnOnce() -> T,
    {
        self.enqueue(make());
    }

    /// Removes and returns the value at the front of the queue.
    ///
    /// Returns `None` if the queue was empty at the time of the call.
    pub fn dequeue(&self) -> Option<T> {
        let guard = epoch::pin();

        loop {
            let head = self.head.load(Acquire, &guard);

            // Safety: `head` is never null and cannot be freed while pinned.
            let next = unsafe { head.deref() }.next.load(Acquire, &guard);

            // Safety: non-null nodes stay alive while `guard` is held.
            let Some(node) = (unsafe { next.as_ref() }) else {
                return None;
            };

            let tail = self.tail.load(Acquire, &guard);
            if head == tail {
                // An insertion linked `next` but has not swung the tail yet.
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Release, Relaxed, &guard);
                continue;
            }

            if self
                .head
                .compare_exchange(head, next, Release, Relaxed, &guard)
                .is_ok()
            {
                // Safety: winning the CAS grants exclusive ownership of the
                // value stored in `next`, which is now the dummy node. The old
                // head is unreachable and retired through the epoch.
                unsafe {
                    guard.defer_destroy(head);
                    return Some(node.value.assume_init_read());
                }
            }
        }
    }

    /// Returns `true` if the queue holds no value at the time of the call.
    ///
    /// The answer may be stale as soon as it is returned.
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        let head = self.head.load(Acquire, &guard);

        // Safety: `head` is never null and cannot be freed while pinned.
        unsafe { head.deref() }.next.load(Acquire, &guard).is_null()
    }

    /// Tries to link `node` after `tail`.
    ///
    /// Returns `false` when `tail` was not the last node; in that case the
    /// lagging tail has been swung forward and the caller retries.
    fn link_after<'g>(
        &self,
        tail: Shared<'g, Node<T>>,
        node: Shared<'g, Node<T>>,
        guard: &'g Guard,
    ) -> bool {
        // Safety: `tail` is never null and cannot be freed while pinned.
        let last = unsafe { tail.deref() };
        let next = last.next.load(Acquire, guard);

        if !next.is_null() {
            let _ = self
                .tail
                .compare_exchange(tail, next, Release, Relaxed, guard);
            return false;
        }

        if last
            .next
            .compare_exchange(Shared::null(), node, Release, Relaxed, guard)
            .is_err()
        {
            return false;
        }

        // Best effort: a failure means another thread already moved it.
        let _ = self
            .tail
            .compare_exchange(tail, node, Release, Relaxed, guard);

        true
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    /// Drops every queued value and frees all nodes, the dummy included.
    fn drop(&mut self) {
        // Safety: `&mut self` guarantees no other thread holds a reference.
        unsafe {
            let guard = epoch::unprotected();
            let mut node = self.head.load(Relaxed, guard);
            let mut is_dummy = true;

            while !node.is_null() {
                let mut owned = node.into_owned();
                node = owned.next.load(Relaxed, guard);

                if !is_dummy {
                    owned.value.assume_init_drop();
                }
                is_dummy = false;
            }
        }
    }
}
