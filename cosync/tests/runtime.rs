mod common;

use cosync::RuntimeBuilder;
use cosync::runtime::{Handle, LocalExecutor, Schedule, WORKER_THREADS_ENV, current_executor};
use cosync::sync::Mutex;
use cosync::task::spawn;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn test_block_on_with_various_worker_counts() {
    for n in 1..=4 {
        let rt = RuntimeBuilder::new().worker_threads(n).build();
        assert_eq!(rt.block_on(async move { n * 10 }), n * 10);
    }
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_zero_worker_threads_panics() {
    let _ = RuntimeBuilder::new().worker_threads(0).build();
}

#[test]
fn test_spawned_tasks_all_complete() {
    common::init_test_logging();
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let seen = Arc::new(Mutex::new(HashSet::new()));

    let s = seen.clone();
    let sum = rt.block_on(async move {
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let seen = s.clone();
                spawn(async move {
                    seen.lock().await.insert(i);
                    i
                })
            })
            .collect();

        let mut sum = 0;
        for handle in handles {
            sum += handle.await;
        }
        sum
    });

    assert_eq!(sum, (0..50).sum::<i32>());
    assert_eq!(seen.try_lock().unwrap().len(), 50);
}

#[test]
fn test_nested_spawns_share_one_mutex() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();
    let counter = Arc::new(Mutex::new(0usize));

    let c = counter.clone();
    rt.block_on(async move {
        let outer: Vec<_> = (0..4)
            .map(|_| {
                let counter = c.clone();
                spawn(async move {
                    let inner: Vec<_> = (0..5)
                        .map(|_| {
                            let counter = counter.clone();
                            spawn(async move {
                                let mut guard = counter.lock().await;
                                cosync::yield_now().await;
                                *guard += 1;
                            })
                        })
                        .collect();

                    for handle in inner {
                        handle.await;
                    }
                })
            })
            .collect();

        for handle in outer {
            handle.await;
        }
    });

    assert_eq!(*counter.try_lock().unwrap(), 20);
}

#[test]
fn test_handle_current_inside_runtime() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();
    let expected = rt.handle().clone();

    let same = rt.block_on(async move {
        let current = Handle::current();
        let nested = spawn(async move { Handle::current().ptr_eq(&current) }).await;
        nested && Handle::current().ptr_eq(&expected)
    });

    assert!(same);
    assert!(Handle::try_current().is_none());
    assert!(current_executor().is_none());
}

#[test]
fn test_spawn_from_outside_through_handle() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();
    let handle = rt.handle().clone();

    let task = thread::spawn(move || handle.spawn(async { 7 }))
        .join()
        .unwrap();

    assert_eq!(rt.block_on(task), 7);
}

#[test]
fn test_posted_jobs_never_run_inline() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();
    let ran = Arc::new(AtomicUsize::new(0));

    let r = ran.clone();
    let ran_inline = rt.block_on(async move {
        let executor = current_executor().unwrap();
        let job_ran = r.clone();
        executor.post(Box::new(move || {
            job_ran.fetch_add(1, Ordering::SeqCst);
        }));
        r.load(Ordering::SeqCst) == 1
    });

    while ran.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    assert!(!ran_inline);
}

#[test]
fn test_dispatch_runs_inline_on_own_worker() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();

    let inline = rt.block_on(async {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        Handle::current().dispatch(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        ran.load(Ordering::SeqCst) == 1
    });

    assert!(inline);
}

#[test]
fn test_local_executor_is_current_inside_block_on() {
    let executor = LocalExecutor::new();

    let found = executor.block_on(async { current_executor().is_some() });

    assert!(found);
    assert!(current_executor().is_none());
}

#[test]
fn test_thread_name_prefix() {
    let rt = RuntimeBuilder::new()
        .worker_threads(2)
        .thread_name("pool")
        .build();

    let name = rt.block_on(async { thread::current().name().map(str::to_owned) });

    assert!(name.unwrap().starts_with("pool-"));
}

#[test]
fn test_explicit_shutdown() {
    let rt = RuntimeBuilder::new().worker_threads(3).build();

    assert_eq!(rt.block_on(async { 5 }), 5);
    rt.shutdown();
}

#[test]
fn test_env_variable_name() {
    assert_eq!(WORKER_THREADS_ENV, "COSYNC_WORKER_THREADS");
}
