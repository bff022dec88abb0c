// src/engine/worker.rs

//! The worker loop behind [`Queue::serve`](crate::engine::Queue::serve).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, error};

use crate::engine::Queue;
use crate::engine::lifecycle::{ServeOutcome, ServeReport, TaskFailure};
use crate::engine::ready::Next;
use crate::graph::TaskControl;
use crate::types::PanicPolicy;

/// Run ready tasks on the calling thread until the queue drains or shuts
/// down.
pub(crate) fn serve(queue: &Queue) -> ServeReport {
    let mut executed = 0;

    loop {
        match queue.ready.next() {
            Next::Run(task) => {
                executed += 1;
                run_task(queue, task);
            }
            Next::Drained => {
                debug!(executed, "worker exiting: task graph drained");
                return ServeReport {
                    outcome: ServeOutcome::Drained,
                    executed,
                };
            }
            Next::ShutDown => {
                debug!(executed, "worker exiting: queue shut down");
                return ServeReport {
                    outcome: ServeOutcome::ShutDown,
                    executed,
                };
            }
        }
    }
}

/// Execute one task outside every scheduler lock, then propagate its
/// completion to the tasks waiting on it.
fn run_task(queue: &Queue, task: Arc<TaskControl>) {
    let id = task.id();
    let Some(action) = task.take_action() else {
        debug_assert!(false, "{id} was handed to a worker twice");
        error!(task = %id, "task handed to a worker twice; skipping");
        return;
    };

    debug!(task = %id, "task started");
    let outcome = panic::catch_unwind(AssertUnwindSafe(action));

    let released: Vec<Arc<TaskControl>> = task
        .complete()
        .into_iter()
        .filter(|dependent| dependent.release())
        .collect();
    debug!(task = %id, released = released.len(), "task finished");
    queue.completed.fetch_add(1, Ordering::Relaxed);
    queue.ready.finish(released);

    if let Err(payload) = outcome {
        let message = panic_message(payload.as_ref());
        queue.panicked.fetch_add(1, Ordering::Relaxed);
        if queue.options.record_failures {
            queue.failures.lock().push(TaskFailure {
                task: id,
                message: message.clone(),
            });
        }
        match queue.options.panic_policy {
            PanicPolicy::Isolate => {
                error!(task = %id, %message, "task panicked; dependents released");
            }
            PanicPolicy::Propagate => {
                error!(task = %id, %message, "task panicked; propagating to worker");
                panic::resume_unwind(payload);
            }
        }
    }
}

/// Render a panic payload as text.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
