#![allow(dead_code)]

use ooqueue::PanicPolicy;
use ooqueue::config::{QueueSection, RawWorkloadFile, TaskSpec, WorkloadFile};

/// Builder for `WorkloadFile` to simplify test setup.
pub struct WorkloadBuilder {
    workload: RawWorkloadFile,
}

impl WorkloadBuilder {
    pub fn new() -> Self {
        Self {
            workload: RawWorkloadFile {
                queue: QueueSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.workload.task.push(task);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workload.queue.workers = workers;
        self
    }

    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.workload.queue.panic_policy = policy;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.workload.queue.iterations = iterations;
        self
    }

    pub fn build(self) -> WorkloadFile {
        WorkloadFile::try_from(self.workload).expect("Failed to build valid workload from builder")
    }
}

impl Default for WorkloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskSpec`.
pub struct TaskSpecBuilder {
    task: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            task: TaskSpec {
                name: name.to_string(),
                writes: vec![],
                reads: vec![],
                sleep_ms: 0,
                panic: false,
                repeat: 1,
            },
        }
    }

    pub fn writes(mut self, resource: &str) -> Self {
        self.task.writes.push(resource.to_string());
        self
    }

    pub fn reads(mut self, resource: &str) -> Self {
        self.task.reads.push(resource.to_string());
        self
    }

    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.task.sleep_ms = ms;
        self
    }

    pub fn panics(mut self) -> Self {
        self.task.panic = true;
        self
    }

    pub fn repeat(mut self, n: usize) -> Self {
        self.task.repeat = n;
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}
