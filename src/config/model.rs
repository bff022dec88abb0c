// src/config/model.rs

use serde::Deserialize;

use crate::engine::QueueOptions;
use crate::types::PanicPolicy;

/// Top-level workload as read from a TOML file, before validation.
///
/// ```toml
/// [queue]
/// workers = 4
/// panic_policy = "isolate"
///
/// [[task]]
/// name = "load"
/// writes = ["a"]
/// sleep_ms = 10
///
/// [[task]]
/// name = "report"
/// reads = ["a"]
/// ```
///
/// Tasks are submitted in file order, which is what gives conflicting tasks
/// their relative order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWorkloadFile {
    /// Queue and worker-pool settings from `[queue]`.
    #[serde(default)]
    pub queue: QueueSection,

    /// All tasks from `[[task]]`, in submission order.
    #[serde(default)]
    pub task: Vec<TaskSpec>,
}

/// A workload that passed validation.
///
/// Only obtainable through `TryFrom<RawWorkloadFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct WorkloadFile {
    pub queue: QueueSection,
    pub task: Vec<TaskSpec>,
}

impl WorkloadFile {
    pub(crate) fn new_unchecked(queue: QueueSection, task: Vec<TaskSpec>) -> Self {
        Self { queue, task }
    }

    /// Total number of submissions the harness will make.
    pub fn total_submissions(&self) -> usize {
        let per_iteration: usize = self.task.iter().map(|t| t.repeat).sum();
        per_iteration * self.queue.iterations
    }
}

/// `[queue]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSection {
    /// Worker threads to run (`--workers` overrides this).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// `"isolate"` (default) or `"propagate"`.
    #[serde(default)]
    pub panic_policy: PanicPolicy,

    /// Submissions between ledger prune passes; `0` disables pruning.
    #[serde(default = "default_prune_interval")]
    pub prune_interval: usize,

    /// How many times the whole task list is submitted.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

fn default_workers() -> usize {
    4
}

fn default_prune_interval() -> usize {
    crate::engine::DEFAULT_PRUNE_INTERVAL
}

fn default_iterations() -> usize {
    1
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            panic_policy: PanicPolicy::default(),
            prune_interval: default_prune_interval(),
            iterations: default_iterations(),
        }
    }
}

impl QueueSection {
    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            panic_policy: self.panic_policy,
            prune_interval: (self.prune_interval > 0).then_some(self.prune_interval),
            record_failures: true,
        }
    }
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    /// Label used in the plan and in logs. Must be unique.
    pub name: String,

    /// Resource names this task writes.
    #[serde(default)]
    pub writes: Vec<String>,

    /// Resource names this task reads.
    #[serde(default)]
    pub reads: Vec<String>,

    /// Simulated work: the task sleeps this long.
    #[serde(default)]
    pub sleep_ms: u64,

    /// Panic instead of returning, to exercise the panic policy.
    #[serde(default)]
    pub panic: bool,

    /// Submit this task this many times back to back.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}
