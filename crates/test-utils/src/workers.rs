use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use ooqueue::{Queue, ServeReport};
use tracing::{debug, warn};

/// Outcome of one worker thread: its report, or the panic message if `serve`
/// unwound.
pub type WorkerResult = Result<ServeReport, String>;

/// A pool of threads each running `Queue::serve` once.
pub struct Workers {
    queue: Arc<Queue>,
    rx: mpsc::Receiver<WorkerResult>,
    handles: Vec<thread::JoinHandle<()>>,
}

/// Start `count` threads that serve `queue` until it drains or shuts down.
pub fn spawn_workers(queue: &Arc<Queue>, count: usize) -> Workers {
    let (tx, rx) = mpsc::channel();
    let handles = (0..count)
        .map(|i| {
            let queue = Arc::clone(queue);
            let tx = tx.clone();
            thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| queue.serve()))
                        .map_err(describe_panic);
                    let _ = tx.send(result);
                })
                .expect("failed to spawn worker thread")
        })
        .collect();
    Workers {
        queue: Arc::clone(queue),
        rx,
        handles,
    }
}

impl Workers {
    /// Wait for every worker, or return an error describing the queue if
    /// they have not all returned within `timeout`.
    ///
    /// On timeout the stuck threads are detached, not joined.
    pub fn try_join_within(self, timeout: Duration) -> Result<Vec<WorkerResult>> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::with_capacity(self.handles.len());

        while results.len() < self.handles.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(result) => results.push(result),
                Err(_) => {
                    warn!(
                        returned = results.len(),
                        total = self.handles.len(),
                        ?timeout,
                        stats = ?self.queue.stats(),
                        "workers did not return in time"
                    );
                    bail!(
                        "only {} of {} workers returned within {:?} ({:?})",
                        results.len(),
                        self.handles.len(),
                        timeout,
                        self.queue.state()
                    );
                }
            }
        }

        for handle in self.handles {
            if handle.join().is_err() {
                bail!("worker thread panicked outside serve");
            }
        }
        debug!(workers = results.len(), "all workers returned");
        Ok(results)
    }

    /// [`Workers::try_join_within`], failing the test instead of hanging.
    pub fn join_within(self, timeout: Duration) -> Vec<WorkerResult> {
        self.try_join_within(timeout)
            .unwrap_or_else(|e| panic!("{e:#}"))
    }

    /// Like [`Workers::join_within`] with a 5-second limit, expecting every
    /// worker to have returned normally.
    pub fn join(self) -> Vec<ServeReport> {
        self.join_within(Duration::from_secs(5))
            .into_iter()
            .map(|r| r.unwrap_or_else(|msg| panic!("worker panicked: {msg}")))
            .collect()
    }
}

fn describe_panic(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooqueue::NO_RESOURCES;

    #[test]
    fn stuck_workers_are_reported_instead_of_hanging() {
        let queue = Arc::new(Queue::new());
        let (release, gate) = mpsc::channel::<()>();
        queue.submit(
            move || {
                let _ = gate.recv();
            },
            NO_RESOURCES,
            NO_RESOURCES,
        );

        let err = spawn_workers(&queue, 2)
            .try_join_within(Duration::from_millis(50))
            .unwrap_err();
        assert!(err.to_string().contains("of 2 workers returned"), "{err}");

        release.send(()).unwrap();
    }

    #[test]
    fn panicking_serve_is_reported_per_worker() {
        let queue = Arc::new(Queue::with_options(ooqueue::QueueOptions {
            panic_policy: ooqueue::PanicPolicy::Propagate,
            ..Default::default()
        }));
        queue.submit(|| panic!("kaboom"), NO_RESOURCES, NO_RESOURCES);

        let results = spawn_workers(&queue, 1)
            .try_join_within(Duration::from_secs(5))
            .unwrap();
        assert_eq!(results, vec![Err("kaboom".to_string())]);
    }
}
