// src/harness/report.rs

//! Summary of one harness run.

use std::fmt;
use std::time::Duration;

use crate::engine::TaskFailure;
use crate::errors::{QueueError, Result};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub workers: usize,
    pub submitted: u64,
    pub completed: u64,
    pub unfinished: usize,
    pub resources: usize,
    /// Workers whose `serve` call unwound (panic policy `propagate`).
    pub worker_panics: usize,
    /// At least one worker returned because of a shutdown request.
    pub shut_down: bool,
    pub failures: Vec<TaskFailure>,
    pub elapsed: Duration,
    /// Lower bound on `elapsed` given unlimited workers.
    pub critical_path: Duration,
}

impl RunReport {
    /// Turn an incomplete run into an error.
    ///
    /// Isolated task panics alone do not fail the run; a worker that unwound,
    /// or tasks left behind without a shutdown request, do.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.worker_panics > 0 {
            return Err(match self.failures.first() {
                Some(failure) => QueueError::TaskPanicked {
                    task: failure.task,
                    message: failure.message.clone(),
                },
                None => QueueError::WorkerFailed(format!(
                    "{} worker(s) panicked",
                    self.worker_panics
                )),
            });
        }
        if self.unfinished > 0 && !self.shut_down {
            return Err(QueueError::WorkerFailed(format!(
                "{} task(s) left unfinished after every worker returned",
                self.unfinished
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ooqueue run")?;
        writeln!(f, "  workers        = {}", self.workers)?;
        writeln!(f, "  resources      = {}", self.resources)?;
        writeln!(f, "  submitted      = {}", self.submitted)?;
        writeln!(f, "  completed      = {}", self.completed)?;
        writeln!(f, "  unfinished     = {}", self.unfinished)?;
        writeln!(f, "  task panics    = {}", self.failures.len())?;
        writeln!(f, "  worker panics  = {}", self.worker_panics)?;
        writeln!(f, "  shut down      = {}", self.shut_down)?;
        writeln!(f, "  elapsed        = {}ms", self.elapsed.as_millis())?;
        write!(f, "  critical path  = {}ms", self.critical_path.as_millis())
    }
}
