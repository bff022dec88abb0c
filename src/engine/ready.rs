// src/engine/ready.rs

//! Ready queue and the worker wait condition.
//!
//! One lock covers the FIFO of runnable tasks, the unfinished-task counter,
//! the idle-worker counter and the shutdown flag. They have to change
//! together: a worker decides to sleep based on all four, and every change
//! that could end that sleep is made under the same lock before notifying.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use crate::graph::TaskControl;

#[derive(Debug, Default)]
struct ReadyState {
    tasks: VecDeque<Arc<TaskControl>>,
    /// Submitted but not yet finished.
    unfinished: usize,
    /// Workers currently blocked in [`ReadyQueue::next`].
    idle: usize,
    /// Times a parked worker resumed from the condvar.
    wakeups: u64,
    shutdown: bool,
}

/// What a worker should do next.
#[derive(Debug)]
pub enum Next {
    Run(Arc<TaskControl>),
    Drained,
    ShutDown,
}

/// Point-in-time view of the ready queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadySnapshot {
    pub ready: usize,
    pub unfinished: usize,
    pub idle: usize,
    pub wakeups: u64,
    pub shutdown: bool,
}

#[derive(Debug, Default)]
pub struct ReadyQueue {
    state: Mutex<ReadyState>,
    available: Condvar,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a newly submitted task as unfinished.
    ///
    /// Returns `false` if the queue has been shut down; the task is counted
    /// anyway but will never be handed to a worker.
    pub fn begin_task(&self) -> bool {
        let mut state = self.state.lock();
        state.unfinished += 1;
        !state.shutdown
    }

    /// Push a task whose predecessors have all finished.
    pub fn push(&self, task: Arc<TaskControl>) {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        let idle = state.idle;
        drop(state);
        self.wake(1, idle);
    }

    /// Block until there is a task to run, the graph is drained, or the
    /// queue is shut down.
    pub fn next(&self) -> Next {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return Next::ShutDown;
            }
            if let Some(task) = state.tasks.pop_front() {
                return Next::Run(task);
            }
            if state.unfinished == 0 {
                return Next::Drained;
            }
            state.idle += 1;
            self.available.wait(&mut state);
            state.idle -= 1;
            state.wakeups += 1;
        }
    }

    /// Account for one finished task and enqueue the dependents it released.
    pub fn finish(&self, released: Vec<Arc<TaskControl>>) {
        let mut state = self.state.lock();
        let newly_ready = released.len();
        state.tasks.extend(released);

        debug_assert!(state.unfinished > 0, "unfinished counter underflow");
        if state.unfinished == 0 {
            error!("unfinished counter underflow on task completion");
        } else {
            state.unfinished -= 1;
        }

        let idle = state.idle;
        let drained = state.unfinished == 0;
        drop(state);

        if drained {
            debug!("task graph drained; waking all workers");
            self.available.notify_all();
        } else {
            self.wake(newly_ready, idle);
        }
    }

    /// Wake every waiter and make all current and future `next` calls
    /// return [`Next::ShutDown`].
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.available.notify_all();
    }

    pub fn snapshot(&self) -> ReadySnapshot {
        let state = self.state.lock();
        ReadySnapshot {
            ready: state.tasks.len(),
            unfinished: state.unfinished,
            idle: state.idle,
            wakeups: state.wakeups,
            shutdown: state.shutdown,
        }
    }

    /// Wake at most `min(newly_ready, idle)` waiters.
    ///
    /// `idle` was sampled under the lock together with the push. Waiters that
    /// were notified but have not run yet are still counted, so this can
    /// over-notify, never under-notify.
    fn wake(&self, newly_ready: usize, idle: usize) {
        for _ in 0..newly_ready.min(idle) {
            if !self.available.notify_one() {
                break;
            }
        }
    }
}
