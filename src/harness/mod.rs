// src/harness/mod.rs

//! Workload driver used by the `ooqueue` binary.
//!
//! The harness is an ordinary caller of the queue: it submits every task of
//! a workload file, runs a pool of workers on Tokio's blocking pool, and
//! reports what happened.
//!
//! - [`workload`] expands a workload into ordered submissions.
//! - [`plan`] computes the dependency graph for `--dry-run`.
//! - [`report`] holds the run summary.

pub mod plan;
pub mod report;
pub mod workload;

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::WorkloadFile;
use crate::engine::{Queue, ServeOutcome};
use crate::errors::{QueueError, Result};

pub use plan::{Plan, PlanStep};
pub use report::RunReport;
pub use workload::{ResourceInterner, Submission, expand};

/// Submit `workload` to a fresh queue and serve it with `workers` threads.
///
/// Ctrl-C shuts the queue down; workers then return without running the
/// remaining tasks.
pub async fn run_workload(workload: &WorkloadFile, workers: usize) -> Result<RunReport> {
    if workers == 0 {
        return Err(QueueError::ConfigError(
            "worker count must be >= 1 (got 0)".to_string(),
        ));
    }
    let critical_path = Plan::build(workload)?.critical_path()?;

    let queue = Arc::new(Queue::with_options(workload.queue.queue_options()));
    let (submissions, resources) = expand(workload);

    let started = Instant::now();
    for submission in submissions {
        submission.submit_to(&queue);
    }
    info!(
        submitted = queue.stats().submitted,
        workers,
        "workload submitted; starting workers"
    );

    let ctrl_c = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; shutting the queue down");
            queue.shutdown();
        })
    };

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::task::spawn_blocking(move || queue.serve())
        })
        .collect();

    let mut worker_panics = 0;
    let mut shut_down = false;
    for handle in handles {
        match handle.await {
            Ok(report) => {
                shut_down |= report.outcome == ServeOutcome::ShutDown;
            }
            Err(e) if e.is_panic() => {
                error!("worker unwound from a task panic");
                worker_panics += 1;
            }
            Err(e) => {
                ctrl_c.abort();
                return Err(QueueError::WorkerFailed(e.to_string()));
            }
        }
    }
    ctrl_c.abort();

    let stats = queue.stats();
    let report = RunReport {
        workers,
        submitted: stats.submitted,
        completed: stats.completed,
        unfinished: stats.unfinished,
        resources: resources.len(),
        worker_panics,
        shut_down,
        failures: queue.take_failures(),
        elapsed: started.elapsed(),
        critical_path,
    };

    info!(
        completed = report.completed,
        unfinished = report.unfinished,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "workload finished"
    );

    Ok(report)
}
