// tests/recursive_submission.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use ooqueue::{NO_RESOURCES, Queue, ResourceId};
use ooqueue_test_utils::{init_tracing, spawn_workers};

/// Each task spawns two children until `depth` reaches zero.
fn fan_out(queue: &Arc<Queue>, hits: &Arc<AtomicUsize>, depth: u32, slot: u64) {
    let q = Arc::clone(queue);
    let hits = Arc::clone(hits);
    queue.submit(
        move || {
            hits.fetch_add(1, Ordering::Relaxed);
            if depth > 0 {
                fan_out(&q, &hits, depth - 1, slot * 2);
                fan_out(&q, &hits, depth - 1, slot * 2 + 1);
            }
        },
        [slot % 8],
        [u64::from(depth)],
    );
}

#[test]
fn tasks_submitted_by_tasks_all_run_before_serve_returns() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let depth = 10;

    fan_out(&queue, &hits, depth, 1);
    let reports = spawn_workers(&queue, 4).join();

    let expected = (1usize << (depth + 1)) - 1;
    assert_eq!(hits.load(Ordering::Relaxed), expected);
    assert_eq!(reports.iter().map(|r| r.executed).sum::<usize>(), expected);
    assert_eq!(queue.stats().unfinished, 0);
}

/// Per-resource access tracker: `-1` while written, `n > 0` while `n` readers
/// hold it.
struct Guards {
    slots: Vec<AtomicIsize>,
    violations: AtomicUsize,
}

impl Guards {
    fn new(n: usize) -> Self {
        Self {
            slots: (0..n).map(|_| AtomicIsize::new(0)).collect(),
            violations: AtomicUsize::new(0),
        }
    }

    fn write(&self, r: usize, f: impl FnOnce()) {
        if self.slots[r]
            .compare_exchange(0, -1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        f();
        self.slots[r].store(0, Ordering::SeqCst);
    }

    fn read(&self, r: usize, f: impl FnOnce()) {
        if self.slots[r].fetch_add(1, Ordering::SeqCst) < 0 {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        f();
        self.slots[r].fetch_sub(1, Ordering::SeqCst);
    }
}

/// Tiny deterministic generator so the workload is repeatable.
fn next_rand(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *state >> 33
}

fn market_task(queue: &Arc<Queue>, guards: &Arc<Guards>, seed: u64, budget: u32) {
    let resources = guards.slots.len() as u64;
    let mut state = seed;
    let w = (next_rand(&mut state) % resources) as usize;
    let r = (next_rand(&mut state) % resources) as usize;

    let q = Arc::clone(queue);
    let g = Arc::clone(guards);
    let body = move || {
        let children = if budget > 0 { 1 + (next_rand(&mut state) % 3) as u32 } else { 0 };
        g.write(w, || {
            if r != w {
                g.read(r, std::thread::yield_now);
            }
        });
        for c in 0..children {
            market_task(&q, &g, state.wrapping_add(u64::from(c)), budget - 1);
        }
    };

    if r == w {
        queue.submit(body, [ResourceId::new(w as u64)], NO_RESOURCES);
    } else {
        queue.submit(body, [ResourceId::new(w as u64)], [ResourceId::new(r as u64)]);
    }
}

#[test]
fn recursive_workload_never_overlaps_conflicting_accesses() {
    init_tracing();
    let queue = Arc::new(Queue::new());
    let guards = Arc::new(Guards::new(6));

    for seed in 0..16 {
        market_task(&queue, &guards, seed, 5);
    }
    let reports = spawn_workers(&queue, 6).join();

    assert!(reports.iter().map(|r| r.executed).sum::<usize>() >= 16);
    assert_eq!(guards.violations.load(Ordering::SeqCst), 0);
    assert_eq!(queue.stats().unfinished, 0);
}
