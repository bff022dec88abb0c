// src/graph/builder.rs

//! Turning a submission into graph edges.
//!
//! The ledger says *who* a new task must wait for; this module attaches the
//! task to each of those predecessors. Attaching races with the predecessor
//! finishing, and the race is settled under the predecessor's own lock: an
//! edge is either recorded before the predecessor drains its dependents, or
//! refused because it already has.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::trace;

use crate::graph::task::TaskControl;
use crate::types::ResourceId;

/// Normalised resource declaration of a single submission.
///
/// Duplicates collapse, and a resource that is both read and written is kept
/// only in the write set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSets {
    writes: BTreeSet<ResourceId>,
    reads: BTreeSet<ResourceId>,
}

impl ResourceSets {
    pub fn new<W, R>(writes: W, reads: R) -> Self
    where
        W: IntoIterator,
        W::Item: Into<ResourceId>,
        R: IntoIterator,
        R::Item: Into<ResourceId>,
    {
        let writes: BTreeSet<ResourceId> = writes.into_iter().map(Into::into).collect();
        let reads = reads
            .into_iter()
            .map(Into::into)
            .filter(|r| !writes.contains(r))
            .collect();
        Self { writes, reads }
    }

    pub fn writes(&self) -> &BTreeSet<ResourceId> {
        &self.writes
    }

    pub fn reads(&self) -> &BTreeSet<ResourceId> {
        &self.reads
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.reads.is_empty()
    }
}

/// Attach `task` behind every predecessor that has not finished yet.
///
/// Returns the number of edges that were actually created. Each created edge
/// has already been counted in `task`'s pending counter.
pub fn wire_dependencies(task: &Arc<TaskControl>, predecessors: &[Arc<TaskControl>]) -> usize {
    let mut edges = 0;
    for pred in predecessors {
        if pred.add_dependent(task) {
            edges += 1;
        } else {
            trace!(
                task = %task.id(),
                predecessor = %pred.id(),
                "predecessor finished before the edge was attached"
            );
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::task::TaskId;

    fn noop(id: u64) -> Arc<TaskControl> {
        TaskControl::new(TaskId::new(id), Box::new(|| {}))
    }

    #[test]
    fn overlapping_sets_keep_the_write() {
        let sets = ResourceSets::new([1u64, 2, 2], [2u64, 3, 3]);
        assert!(!sets.is_empty());
        assert_eq!(sets.writes().len(), 2);
        assert_eq!(
            sets.reads().iter().copied().collect::<Vec<_>>(),
            vec![ResourceId::new(3)]
        );
    }

    #[test]
    fn finished_predecessor_is_skipped() {
        let a = noop(1);
        let b = noop(2);
        let c = noop(3);
        a.complete();

        assert_eq!(wire_dependencies(&c, &[a, Arc::clone(&b)]), 1);
        // guard + edge to `b`
        assert_eq!(c.pending(), 2);
        assert!(!c.release());
        assert!(b.complete()[0].release());
    }
}
