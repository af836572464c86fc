mod common;

use cosync::RuntimeBuilder;
use cosync::error::SyncError;
use cosync::runtime::LocalExecutor;
use cosync::sync::{CoBinarySemaphore, CoSemaphore};
use cosync::task::spawn;
use cosync::time::sleep;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Records the highest value a counter reaches.
fn enter(inside: &AtomicUsize, peak: &AtomicUsize) {
    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
    peak.fetch_max(now, Ordering::SeqCst);
}

#[test]
fn test_eight_tasks_never_exceed_three_holders() {
    common::init_test_logging();
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let semaphore = Arc::new(CoSemaphore::<3>::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (s, i, p) = (semaphore.clone(), inside.clone(), peak.clone());
    rt.block_on(async move {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (semaphore, inside, peak) = (s.clone(), i.clone(), p.clone());
                spawn(async move {
                    for _ in 0..10 {
                        semaphore.acquire().await;
                        enter(&inside, &peak);
                        assert!(inside.load(Ordering::SeqCst) <= 3);
                        sleep(Duration::from_millis(1)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        semaphore.release().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
    assert_eq!(semaphore.count(), 3);
}

#[test]
fn test_binary_semaphore_is_a_lock() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let semaphore = Arc::new(CoBinarySemaphore::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let entries = Arc::new(AtomicUsize::new(0));

    let (s, i, e) = (semaphore.clone(), inside.clone(), entries.clone());
    rt.block_on(async move {
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let (semaphore, inside, entries) = (s.clone(), i.clone(), e.clone());
                spawn(async move {
                    for _ in 0..25 {
                        semaphore.acquire().await;
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        cosync::yield_now().await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        entries.fetch_add(1, Ordering::SeqCst);
                        semaphore.release().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(entries.load(Ordering::SeqCst), 12 * 25);
    assert_eq!(semaphore.count(), 1);
}

#[test]
fn test_release_n_resumes_batch() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let semaphore = Arc::new(CoSemaphore::<4>::with_permits(0).unwrap());
    let resumed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (semaphore, resumed) = (semaphore.clone(), resumed.clone());
            rt.spawn(async move {
                semaphore.acquire().await;
                resumed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(resumed.load(Ordering::SeqCst), 0);

    semaphore.release_n(4).unwrap();

    for handle in handles {
        rt.block_on(handle);
    }

    assert_eq!(resumed.load(Ordering::SeqCst), 4);
    assert_eq!(semaphore.count(), 0);
}

#[test]
fn test_timed_acquire_outcomes_are_exclusive() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let semaphore = Arc::new(CoSemaphore::<2>::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let outcomes = Arc::new(AtomicUsize::new(0));

    let (s, i, p, o) = (
        semaphore.clone(),
        inside.clone(),
        peak.clone(),
        outcomes.clone(),
    );
    rt.block_on(async move {
        let handles: Vec<_> = (0..20u64)
            .map(|n| {
                let (semaphore, inside, peak, outcomes) =
                    (s.clone(), i.clone(), p.clone(), o.clone());
                spawn(async move {
                    if semaphore
                        .try_acquire_for(Duration::from_millis(1 + n % 4))
                        .await
                    {
                        enter(&inside, &peak);
                        sleep(Duration::from_millis(2)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        semaphore.release().unwrap();
                    }
                    outcomes.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(outcomes.load(Ordering::SeqCst), 20);
    assert!(peak.load(Ordering::SeqCst) <= 2);

    // Permits handed to waiters that had already timed out would be lost.
    assert_eq!(semaphore.count(), 2);
}

#[test]
fn test_overflow_is_reported() {
    let semaphore = CoSemaphore::<2>::new();

    assert_eq!(
        semaphore.release(),
        Err(SyncError::PermitOverflow { max: 2 })
    );
    assert_eq!(semaphore.count(), 2);
}

#[test]
fn test_local_executor_round_trip() {
    let executor = LocalExecutor::new();
    let semaphore = CoSemaphore::<2>::with_permits(1).unwrap();

    executor.block_on(async {
        semaphore.acquire().await;
        assert!(!semaphore.try_acquire());
        semaphore.release().unwrap();
    });

    assert_eq!(semaphore.count(), 1);
    assert_eq!(semaphore.close(), Ok(()));
}
