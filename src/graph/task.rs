// src/graph/task.rs

//! Per-task control block shared between the ledger, the ready queue,
//! predecessors' dependent lists and the executing worker.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::error;

use crate::graph::ledger::LedgerNode;

/// The work carried by a task.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Identifier assigned to each submitted task, in submission order.
///
/// Only used for logging and diagnostics; there is no way to wait on a task
/// by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// State guarded by the task's own lock.
struct TaskLinks {
    /// Tasks to notify when this one finishes. Drained exactly once.
    dependents: Vec<Arc<TaskControl>>,
}

/// One submitted unit of work plus its scheduling bookkeeping.
pub struct TaskControl {
    id: TaskId,
    action: Mutex<Option<Action>>,
    /// Unfinished predecessors, plus one while the submitter is still wiring
    /// edges. The task becomes ready when this drops to zero.
    pending: AtomicUsize,
    links: Mutex<TaskLinks>,
    /// Written only while `links` is held.
    completed: AtomicBool,
}

impl fmt::Debug for TaskControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskControl")
            .field("id", &self.id)
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TaskControl {
    /// Create a task that is held back by its submission guard.
    ///
    /// The caller must eventually call [`TaskControl::release`] once for the
    /// guard, after all predecessor edges have been attached.
    pub fn new(id: TaskId, action: Action) -> Arc<Self> {
        Arc::new(Self {
            id,
            action: Mutex::new(Some(action)),
            pending: AtomicUsize::new(1),
            links: Mutex::new(TaskLinks {
                dependents: Vec::new(),
            }),
            completed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Current number of outstanding predecessors (including the submission
    /// guard while it is held).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Ask this task to notify `dependent` when it finishes.
    ///
    /// Returns `false` if this task already completed, in which case the
    /// edge is not needed and `dependent`'s counter is left untouched.
    pub fn add_dependent(&self, dependent: &Arc<TaskControl>) -> bool {
        let mut links = self.links.lock();
        if self.completed.load(Ordering::Acquire) {
            return false;
        }
        // Counted before the lock is released so a racing `complete` can
        // never decrement ahead of this increment.
        dependent.pending.fetch_add(1, Ordering::AcqRel);
        links.dependents.push(Arc::clone(dependent));
        true
    }

    /// Take the action out of the task. Yields `Some` exactly once.
    pub fn take_action(&self) -> Option<Action> {
        self.action.lock().take()
    }

    /// Mark the task as finished and hand back its dependents.
    pub fn complete(&self) -> Vec<Arc<TaskControl>> {
        let mut links = self.links.lock();
        let already = self.completed.swap(true, Ordering::AcqRel);
        debug_assert!(!already, "{} completed twice", self.id);
        if already {
            error!(task = %self.id, "task completed twice; ignoring second completion");
            return Vec::new();
        }
        mem::take(&mut links.dependents)
    }

    /// Drop one outstanding predecessor. Returns `true` if this was the last
    /// one and the task is now ready to run.
    pub fn release(&self) -> bool {
        let prev = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "{} pending counter underflow", self.id);
        if prev == 0 {
            error!(task = %self.id, "pending counter underflow");
            self.pending.store(0, Ordering::Release);
            return false;
        }
        prev == 1
    }
}

impl Drop for TaskControl {
    // Unrun tasks (after a shutdown) can form long dependent chains; unlink
    // them iteratively instead of recursing once per chain link.
    fn drop(&mut self) {
        let mut stack = mem::take(&mut self.links.get_mut().dependents);
        while let Some(task) = stack.pop() {
            if let Ok(mut inner) = Arc::try_unwrap(task) {
                stack.append(&mut inner.links.get_mut().dependents);
            }
        }
    }
}

impl LedgerNode for TaskControl {
    fn node_id(&self) -> TaskId {
        self.id
    }

    fn is_completed(&self) -> bool {
        TaskControl::is_completed(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(id: u64) -> Arc<TaskControl> {
        TaskControl::new(TaskId::new(id), Box::new(|| {}))
    }

    #[test]
    fn guard_alone_makes_task_ready() {
        let task = noop(1);
        assert_eq!(task.pending(), 1);
        assert!(task.release());
    }

    #[test]
    fn dependent_waits_for_every_predecessor() {
        let a = noop(1);
        let b = noop(2);
        let c = noop(3);

        assert!(a.add_dependent(&c));
        assert!(b.add_dependent(&c));
        assert!(!c.release(), "guard release with two predecessors left");

        let from_a = a.complete();
        assert_eq!(from_a.len(), 1);
        assert!(!from_a[0].release());

        let from_b = b.complete();
        assert!(from_b[0].release());
    }

    #[test]
    fn edge_to_completed_task_is_refused() {
        let a = noop(1);
        let b = noop(2);
        assert!(a.complete().is_empty());

        assert!(!a.add_dependent(&b));
        assert_eq!(b.pending(), 1);
    }

    #[test]
    fn action_is_taken_once() {
        let task = noop(1);
        assert!(task.take_action().is_some());
        assert!(task.take_action().is_none());
    }
}
