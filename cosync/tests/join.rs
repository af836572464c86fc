use cosync::sync::{CoMutex, CoSemaphore};
use cosync::time::sleep;
use cosync::{RuntimeBuilder, join};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[test]
fn test_join_single_and_many() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    let result = rt.block_on(async {
        let one = join!(async { 42 });
        let (a, b, c) = join!(async { "x" }, async { 2u8 }, async { Some(3) },);
        (one, a, b, c)
    });

    assert_eq!(result, (42, "x", 2, Some(3)));
}

#[test]
fn test_join_sleeps_run_concurrently() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    let elapsed = rt.block_on(async {
        let start = Instant::now();
        join!(
            sleep(Duration::from_millis(40)),
            sleep(Duration::from_millis(40)),
            sleep(Duration::from_millis(40))
        );
        start.elapsed()
    });

    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_millis(110));
}

#[test]
fn test_join_contending_for_one_mutex() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();
    let mutex = Arc::new(CoMutex::new());
    let inside = Arc::new(AtomicUsize::new(0));

    let total = rt.block_on(async move {
        let critical = |id: usize| {
            let mutex = mutex.clone();
            let inside = inside.clone();
            async move {
                for _ in 0..10 {
                    mutex.lock().await;
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    cosync::yield_now().await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    mutex.unlock().unwrap();
                }
                id
            }
        };

        let (a, b, c) = join!(critical(1), critical(2), critical(3));
        a + b + c
    });

    assert_eq!(total, 6);
}

#[test]
fn test_join_waiters_on_a_semaphore_from_one_task() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();
    let semaphore = Arc::new(CoSemaphore::<2>::with_permits(0).unwrap());

    let s = semaphore.clone();
    let released = rt.block_on(async move {
        let waiter = |s: Arc<CoSemaphore<2>>| async move {
            s.acquire().await;
            1
        };
        let releaser = {
            let s = s.clone();
            async move {
                sleep(Duration::from_millis(10)).await;
                s.release_n(2).unwrap();
                0
            }
        };

        let (a, b, c) = join!(waiter(s.clone()), waiter(s.clone()), releaser);
        a + b + c
    });

    assert_eq!(released, 2);
    assert_eq!(semaphore.count(), 0);
}
