//! Stress tests for the thread pool

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tidepool::prelude::*;

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_small_tasks() {
    let pool: ThreadPool = ThreadPool::with_default_threads().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..100_000)
        .map(|i| {
            let counter = counter.clone();
            pool.submit_with_priority(i % 7, move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap()
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::Relaxed), 100_000);
}

#[test]
#[ignore]
fn stress_test_repeated_create_shutdown() {
    for i in 0..50 {
        let pool: ThreadPool = ThreadPool::new(4).unwrap();

        let handles: Vec<_> = (0..100).map(|x| pool.submit(move || x).unwrap()).collect();
        let sum: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(sum, 4950, "Iteration {}", i);

        if i % 2 == 0 {
            pool.shutdown();
        }
    }
}

#[test]
#[ignore]
fn stress_test_high_contention() {
    let pool: Arc<ThreadPool> = Arc::new(ThreadPool::new(8).unwrap());
    let data = Arc::new(Mutex::new(vec![0i32; 100]));

    let submitters: Vec<_> = (0..16)
        .map(|_| {
            let pool = pool.clone();
            let data = data.clone();
            thread::spawn(move || {
                let handles: Vec<_> = (0..1000)
                    .map(|i| {
                        let data = data.clone();
                        pool.submit_with_priority(i % 4, move || {
                            data.lock()[(i % 100) as usize] += 1;
                        })
                        .unwrap()
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            })
        })
        .collect();

    for s in submitters {
        s.join().unwrap();
    }

    let total: i32 = data.lock().iter().sum();
    assert_eq!(total, 16_000);
}

#[test]
#[ignore]
fn stress_test_panics_do_not_starve_pool() {
    let config = Config::builder()
        .num_threads(4)
        .panic_strategy(PanicStrategy::Isolate)
        .build()
        .unwrap();
    let pool: ThreadPool = ThreadPool::with_config(&config).unwrap();

    let handles: Vec<_> = (0..1000)
        .map(|i| {
            pool.submit(move || {
                if i % 3 == 0 {
                    panic!("task {} failed", i);
                }
                i
            })
            .unwrap()
        })
        .collect();

    let mut ok = 0;
    let mut failed = 0;
    for h in handles {
        match h.join() {
            Ok(_) => ok += 1,
            Err(Error::TaskPanicked(_)) => failed += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 666);
    assert_eq!(failed, 334);
}

#[test]
#[ignore]
fn stress_test_shutdown_under_load() {
    for _ in 0..20 {
        let pool: ThreadPool = ThreadPool::new(4).unwrap();

        let handles: Vec<_> = (0..500)
            .map(|i| {
                pool.submit(move || {
                    thread::sleep(Duration::from_micros(50));
                    i
                })
                .unwrap()
            })
            .collect();

        pool.shutdown();

        // everything resolves one way or the other, nothing hangs
        for h in handles {
            match h.join() {
                Ok(_) | Err(Error::TaskPanicked(_)) | Err(Error::Abandoned) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }
}
