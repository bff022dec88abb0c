// src/engine/mod.rs

//! The out-of-order queue itself.
//!
//! [`Queue`] ties the pieces together:
//! - submissions go through the resource ledger ([`crate::graph::ledger`]),
//!   get wired behind their predecessors and, if nothing holds them back,
//!   land in the ready queue ([`ready`]);
//! - threads that call [`Queue::serve`] run the worker loop ([`worker`]),
//!   which executes ready tasks and releases their dependents;
//! - [`lifecycle`] holds the states and reports exposed to callers.

pub mod lifecycle;
pub mod ready;
pub mod worker;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::graph::{ResourceLedger, ResourceSets, TaskControl, TaskId, wire_dependencies};
use crate::types::{PanicPolicy, ResourceId};

pub use lifecycle::{LifecycleState, QueueStats, ServeOutcome, ServeReport, TaskFailure};
use ready::ReadyQueue;

/// Default number of submissions between ledger prune passes.
pub const DEFAULT_PRUNE_INTERVAL: usize = 1024;

/// Tunables for a [`Queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// What a worker does when a task panics.
    pub panic_policy: PanicPolicy,
    /// Evict stale ledger entries every this many submissions. `None`
    /// keeps every resource ever mentioned.
    pub prune_interval: Option<usize>,
    /// Keep task panics for [`Queue::take_failures`].
    pub record_failures: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            panic_policy: PanicPolicy::default(),
            prune_interval: Some(DEFAULT_PRUNE_INTERVAL),
            record_failures: true,
        }
    }
}

/// Out-of-order task queue.
///
/// Tasks are submitted together with the resources they write and read.
/// A task starts only after every earlier task it conflicts with has
/// finished; tasks that do not conflict run in any order, concurrently if
/// enough workers are serving.
///
/// The queue is `Send + Sync` and is usually shared via `Arc` or a scoped
/// borrow. It must outlive every `serve` call and every running task.
pub struct Queue {
    options: QueueOptions,
    ledger: Mutex<ResourceLedger<TaskControl>>,
    ready: ReadyQueue,
    next_id: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
    failures: Mutex<Vec<TaskFailure>>,
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    pub fn new() -> Self {
        Self::with_options(QueueOptions::default())
    }

    pub fn with_options(options: QueueOptions) -> Self {
        Self {
            options,
            ledger: Mutex::new(ResourceLedger::new(options.prune_interval)),
            ready: ReadyQueue::new(),
            next_id: AtomicU64::new(1),
            completed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    /// Submit `action` declaring the resources it writes and reads.
    ///
    /// Never waits for other tasks, so it may be called from any thread,
    /// including from inside a running task of this same queue. Repeated
    /// ids collapse; an id in both lists counts as a write.
    ///
    /// The returned id is for diagnostics only.
    pub fn submit<F, W, R>(&self, action: F, writes: W, reads: R) -> TaskId
    where
        F: FnOnce() + Send + 'static,
        W: IntoIterator,
        W::Item: Into<ResourceId>,
        R: IntoIterator,
        R::Item: Into<ResourceId>,
    {
        let sets = ResourceSets::new(writes, reads);
        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let task = TaskControl::new(id, Box::new(action));

        if !self.ready.begin_task() {
            warn!(task = %id, "submission after shutdown; task will never run");
        }

        let predecessors = self
            .ledger
            .lock()
            .register(&task, sets.writes(), sets.reads());
        let edges = wire_dependencies(&task, &predecessors);

        debug!(
            task = %id,
            writes = sets.writes().len(),
            reads = sets.reads().len(),
            edges,
            "task submitted"
        );

        if task.release() {
            debug!(task = %id, "task ready on submission");
            self.ready.push(task);
        }

        id
    }

    /// Turn the calling thread into a worker until every submitted task has
    /// finished, or until [`Queue::shutdown`] is called.
    ///
    /// Returns immediately on an empty queue. May be called again after it
    /// returns to serve tasks submitted since.
    pub fn serve(&self) -> ServeReport {
        worker::serve(self)
    }

    /// Wake every worker and make them return, even if tasks are left.
    ///
    /// Tasks that have not started never run. A shut down queue stays shut
    /// down.
    pub fn shutdown(&self) {
        info!(unfinished = self.ready.snapshot().unfinished, "queue shutdown requested");
        self.ready.shutdown();
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_snapshot(&self.ready.snapshot())
    }

    pub fn stats(&self) -> QueueStats {
        let snapshot = self.ready.snapshot();
        QueueStats {
            submitted: self.next_id.load(Ordering::Relaxed) - 1,
            completed: self.completed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            unfinished: snapshot.unfinished,
            ready: snapshot.ready,
            idle_workers: snapshot.idle,
            ledger_entries: self.ledger.lock().len(),
        }
    }

    /// Drain the record of task panics.
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut *self.failures.lock())
    }

    /// Evict ledger entries that can no longer order anything. Returns how
    /// many were removed.
    pub fn prune_ledger(&self) -> usize {
        self.ledger.lock().prune()
    }
}
