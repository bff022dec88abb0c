// src/engine/lifecycle.rs

//! Lifecycle states and the read-only reports the queue hands out.

use std::fmt;

use crate::engine::ready::ReadySnapshot;
use crate::graph::TaskId;

/// Coarse lifecycle of a queue instance.
///
/// `Empty -> Active -> Draining -> Empty` may repeat any number of times.
/// `ShutDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No unfinished tasks and no workers waiting.
    Empty,
    /// At least one task is submitted but not finished.
    Active,
    /// Nothing left to run, but some workers have not yet observed it.
    Draining,
    /// [`Queue::shutdown`](crate::engine::Queue::shutdown) was called.
    ShutDown,
}

impl LifecycleState {
    pub(crate) fn from_snapshot(snapshot: &ReadySnapshot) -> Self {
        if snapshot.shutdown {
            LifecycleState::ShutDown
        } else if snapshot.unfinished > 0 {
            LifecycleState::Active
        } else if snapshot.idle > 0 {
            LifecycleState::Draining
        } else {
            LifecycleState::Empty
        }
    }
}

/// Why a `serve` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Every submitted task had finished and nothing was ready.
    Drained,
    /// The queue was shut down.
    ShutDown,
}

/// Result of one `serve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeReport {
    pub outcome: ServeOutcome,
    /// Tasks this worker executed, including ones that panicked.
    pub executed: usize,
}

/// A task action that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskId,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} panicked: {}", self.task, self.message)
    }
}

/// Counters describing a queue at one moment.
///
/// Fields are read under different locks, so they are individually exact but
/// not mutually consistent while workers are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub submitted: u64,
    pub completed: u64,
    pub panicked: u64,
    pub unfinished: usize,
    pub ready: usize,
    pub idle_workers: usize,
    pub ledger_entries: usize,
}
