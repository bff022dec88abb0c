// src/lib.rs

//! Out-of-order task queue.
//!
//! Callers submit closures together with the resources each one writes and
//! reads. Threads that call [`Queue::serve`] execute the submitted tasks in
//! any order that respects the conflicts implied by those declarations:
//! a task waits for every earlier task that writes something it touches, and
//! a writer also waits for every earlier reader since the previous writer.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use ooqueue::{Queue, NO_RESOURCES};
//!
//! let queue = Queue::new();
//! let total = Arc::new(AtomicUsize::new(0));
//!
//! let t = Arc::clone(&total);
//! queue.submit(move || { t.store(40, Ordering::SeqCst); }, [1u64], NO_RESOURCES);
//! let t = Arc::clone(&total);
//! queue.submit(move || { t.fetch_add(2, Ordering::SeqCst); }, [1u64], NO_RESOURCES);
//!
//! queue.serve();
//! assert_eq!(total.load(Ordering::SeqCst), 42);
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod harness;
pub mod logging;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::WorkloadFile;
use crate::config::loader::load_and_validate;
use crate::harness::{Plan, run_workload};

pub use crate::engine::{
    LifecycleState, Queue, QueueOptions, QueueStats, ServeOutcome, ServeReport, TaskFailure,
};
pub use crate::graph::TaskId;
pub use crate::types::{NO_RESOURCES, PanicPolicy, ResourceId};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workload loading
/// - dry-run planning, or
/// - queue + worker pool + Ctrl-C handling, and the final report
pub async fn run(args: CliArgs) -> Result<()> {
    let workload_path = PathBuf::from(&args.workload);
    let workload = load_and_validate(&workload_path)?;

    if args.dry_run {
        print_dry_run(&workload)?;
        return Ok(());
    }

    let workers = args.workers.unwrap_or(workload.queue.workers);
    info!(
        workload = %workload_path.display(),
        workers,
        submissions = workload.total_submissions(),
        "running workload"
    );

    let report = run_workload(&workload, workers).await?;
    println!("{report}");

    for failure in &report.failures {
        warn!(%failure, "task failed during run");
    }

    report.ensure_complete()?;
    Ok(())
}

/// Dry-run output: queue settings, then every submission and what it waits
/// for.
fn print_dry_run(workload: &WorkloadFile) -> Result<()> {
    let plan = Plan::build(workload)?;

    println!("ooqueue dry-run");
    println!("  queue.workers = {}", workload.queue.workers);
    println!("  queue.panic_policy = {:?}", workload.queue.panic_policy);
    println!("  queue.prune_interval = {}", workload.queue.prune_interval);
    println!("  queue.iterations = {}", workload.queue.iterations);
    println!();
    print!("{plan}");
    println!("critical path: {}ms", plan.critical_path()?.as_millis());

    debug!("dry-run complete (no execution)");
    Ok(())
}
