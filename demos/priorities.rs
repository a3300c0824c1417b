//! Usage tour: results, fire-and-forget work and priorities

use std::thread;
use std::time::Duration;
use tidepool::prelude::*;

fn without_priority() {
    let pool: ThreadPool = ThreadPool::with_default_threads().expect("Failed to start pool");

    let first = pool
        .submit(|| {
            println!("hello world 0");
            0
        })
        .unwrap();

    let value = 1;
    let second = pool
        .submit(move || {
            println!("hello world {}", value);
            value
        })
        .unwrap();

    // no handle is returned for fire-and-forget work
    pool.execute(|| println!("hello world no return")).unwrap();

    println!(
        "Return values: {}, {}",
        first.join().unwrap(),
        second.join().unwrap()
    );
}

fn with_priority() {
    let pool = ThreadPool::<Priority>::new(1).expect("Failed to start pool");

    // keep the only worker busy so the next two queue up
    pool.execute_with_priority(Priority::Normal, || thread::sleep(Duration::from_millis(100)))
        .unwrap();

    let low = pool
        .submit_with_priority(Priority::Low, || println!("Low priority job"))
        .unwrap();
    let high = pool
        .submit_with_priority(Priority::High, || println!("High priority job"))
        .unwrap();

    low.join().unwrap();
    high.join().unwrap();

    let snapshot = pool.metrics();
    println!(
        "executed {} tasks, avg queue wait {}us",
        snapshot.tasks_executed,
        snapshot.avg_queue_wait_ns / 1_000
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Without priority ===");
    without_priority();

    println!("\n=== With priority ===");
    with_priority();
}
