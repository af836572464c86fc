use cosync::runtime::LocalExecutor;
use cosync::sync::Mutex;
use cosync::task;
use cosync::time::{sleep, sleep_until};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cosync::test]
async fn test_sleep_waits_at_least_the_duration() {
    let start = Instant::now();

    sleep(Duration::from_millis(50)).await;

    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[cosync::test]
async fn test_elapsed_sleep_is_ready_immediately() {
    let past = sleep_until(Instant::now() - Duration::from_millis(5));
    assert!(past.is_elapsed());

    let start = Instant::now();
    past.await;
    sleep(Duration::ZERO).await;

    assert!(start.elapsed() < Duration::from_millis(10));
}

#[cosync::test]
async fn test_sleeps_complete_in_deadline_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = [60u64, 20, 40]
        .into_iter()
        .map(|ms| {
            let order = order.clone();
            task::spawn(async move {
                sleep(Duration::from_millis(ms)).await;
                order.lock().await.push(ms);
            })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    assert_eq!(*order.lock().await, vec![20, 40, 60]);
}

#[cosync::test]
async fn test_sleep_until_reports_deadline() {
    let deadline = Instant::now() + Duration::from_millis(15);
    let sleep = sleep_until(deadline);

    assert_eq!(sleep.deadline(), deadline);
    sleep.await;
    assert!(Instant::now() >= deadline);
}

#[cosync::test(worker_threads = 1)]
async fn test_dropped_sleep_does_not_block_shutdown() {
    let abandoned = sleep(Duration::from_secs(30));
    drop(abandoned);

    sleep(Duration::from_millis(5)).await;
}

#[test]
fn test_sleep_on_local_executor() {
    let executor = LocalExecutor::new();
    let start = Instant::now();

    executor.block_on(sleep(Duration::from_millis(20)));

    assert!(start.elapsed() >= Duration::from_millis(20));
}
