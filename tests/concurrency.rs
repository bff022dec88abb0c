// tests/concurrency.rs

use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use ooqueue::{NO_RESOURCES, Queue};
use ooqueue_test_utils::{EventLog, init_tracing, spawn_workers};

#[test]
fn tasks_on_disjoint_resources_run_concurrently() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    // Deadlocks (and times out) unless all four run at once.
    let barrier = Arc::new(Barrier::new(4));

    for r in 0..4u64 {
        let barrier = Arc::clone(&barrier);
        queue.submit(
            move || {
                barrier.wait();
            },
            [r],
            NO_RESOURCES,
        );
    }

    let reports = spawn_workers(&queue, 4).join();
    assert_eq!(reports.iter().map(|r| r.executed).sum::<usize>(), 4);
}

#[test]
fn readers_of_a_shared_resource_run_concurrently() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    let barrier = Arc::new(Barrier::new(4));

    for _ in 0..4 {
        let barrier = Arc::clone(&barrier);
        queue.submit(
            move || {
                barrier.wait();
            },
            NO_RESOURCES,
            [9u64],
        );
    }

    spawn_workers(&queue, 4).join();
}

#[test]
fn write_chain_is_serialized_even_with_spare_workers() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    let log = EventLog::new();
    let step = Duration::from_millis(20);

    for i in 0..4 {
        queue.submit(log.task(format!("w{i}"), step), [1u64], NO_RESOURCES);
    }

    let started = Instant::now();
    spawn_workers(&queue, 4).join();
    let elapsed = started.elapsed();

    assert!(elapsed >= step * 4, "chain finished in {elapsed:?}");
    assert_eq!(log.max_concurrency(), 1);
}

#[test]
fn independent_sleepers_overlap() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    let log = EventLog::new();
    let step = Duration::from_millis(50);

    for r in 0..4u64 {
        queue.submit(log.task(format!("t{r}"), step), [r], NO_RESOURCES);
    }

    spawn_workers(&queue, 4).join();
    assert!(log.max_concurrency() > 1);
}

#[test]
fn idle_workers_wake_when_a_blocker_finishes() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    let barrier = Arc::new(Barrier::new(3));

    // One slow writer holds back three readers that must then run together.
    queue.submit(
        || std::thread::sleep(Duration::from_millis(30)),
        [1u64],
        NO_RESOURCES,
    );
    for _ in 0..3 {
        let barrier = Arc::clone(&barrier);
        queue.submit(
            move || {
                barrier.wait();
            },
            NO_RESOURCES,
            [1u64],
        );
    }

    let reports = spawn_workers(&queue, 3).join();
    assert_eq!(reports.iter().map(|r| r.executed).sum::<usize>(), 4);
}
