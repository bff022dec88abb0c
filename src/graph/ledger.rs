// src/graph/ledger.rs

//! Per-resource record of the most recent writer and the readers admitted
//! since that writer.
//!
//! The ledger answers one question for every new submission: which earlier,
//! still unfinished tasks must complete before it may start. The rules are the
//! readers-writer precedence rules expressed as graph edges:
//!
//! - a write waits for the previous writer and for every reader since it;
//! - a read waits only for the previous writer;
//! - two reads never wait for each other.
//!
//! Entries hold [`Weak`] references so a resource's history never keeps a
//! finished task alive.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::graph::task::TaskId;
use crate::types::ResourceId;

/// What the ledger needs to know about the tasks it tracks.
pub trait LedgerNode {
    fn node_id(&self) -> TaskId;
    fn is_completed(&self) -> bool;
}

/// Dependency state of a single resource.
#[derive(Debug)]
pub struct LedgerEntry<T> {
    last_writer: Option<Weak<T>>,
    active_readers: Vec<Weak<T>>,
}

impl<T> Default for LedgerEntry<T> {
    fn default() -> Self {
        Self {
            last_writer: None,
            active_readers: Vec::new(),
        }
    }
}

fn live<T: LedgerNode>(weak: &Weak<T>) -> Option<Arc<T>> {
    weak.upgrade().filter(|node| !node.is_completed())
}

impl<T: LedgerNode> LedgerEntry<T> {
    /// The last writer, if it is still unfinished.
    pub fn live_writer(&self) -> Option<Arc<T>> {
        self.last_writer.as_ref().and_then(live)
    }

    /// Readers admitted since the last writer that are still unfinished.
    pub fn live_readers(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.active_readers.iter().filter_map(live)
    }

    /// Whether nothing recorded here can produce an edge any more.
    pub fn is_stale(&self) -> bool {
        self.live_writer().is_none() && self.live_readers().next().is_none()
    }

    fn compact_readers(&mut self) {
        self.active_readers
            .retain(|reader| reader.upgrade().is_some_and(|r| !r.is_completed()));
    }
}

/// Resource-id keyed ledger of [`LedgerEntry`]s.
///
/// Not synchronised; the owner wraps it in a lock.
#[derive(Debug)]
pub struct ResourceLedger<T> {
    entries: HashMap<ResourceId, LedgerEntry<T>>,
    registrations: usize,
    prune_interval: Option<usize>,
}

impl<T> Default for ResourceLedger<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            registrations: 0,
            prune_interval: None,
        }
    }
}

impl<T: LedgerNode> ResourceLedger<T> {
    /// Create an empty ledger.
    ///
    /// With `prune_interval = Some(n)` (`n > 0`), stale entries are evicted
    /// after every `n` registrations.
    pub fn new(prune_interval: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            registrations: 0,
            prune_interval: prune_interval.filter(|n| *n > 0),
        }
    }

    /// Number of resources currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, resource: ResourceId) -> Option<&LedgerEntry<T>> {
        self.entries.get(&resource)
    }

    /// Record `task` as the newest accessor of the given resources and return
    /// the unfinished tasks it must wait for, ordered by task id.
    ///
    /// A resource listed in both sets is handled as a write only. The task
    /// never appears among its own predecessors.
    pub fn register(
        &mut self,
        task: &Arc<T>,
        writes: &BTreeSet<ResourceId>,
        reads: &BTreeSet<ResourceId>,
    ) -> Vec<Arc<T>> {
        let me = task.node_id();
        let mut predecessors: BTreeMap<TaskId, Arc<T>> = BTreeMap::new();
        let mut add = |node: Arc<T>, resource: ResourceId, kind: &'static str| {
            let id = node.node_id();
            if id != me {
                trace!(task = %me, predecessor = %id, %resource, kind, "dependency edge");
                predecessors.entry(id).or_insert(node);
            }
        };

        for &resource in writes {
            let entry = self.entries.entry(resource).or_default();
            if let Some(writer) = entry.live_writer() {
                add(writer, resource, "write-after-write");
            }
            for reader in entry.live_readers() {
                add(reader, resource, "write-after-read");
            }
            entry.last_writer = Some(Arc::downgrade(task));
            entry.active_readers.clear();
        }

        for &resource in reads.difference(writes) {
            let entry = self.entries.entry(resource).or_default();
            if let Some(writer) = entry.live_writer() {
                add(writer, resource, "read-after-write");
            }
            // Amortised cleanup: only sweep when the list would reallocate.
            if entry.active_readers.len() == entry.active_readers.capacity() {
                entry.compact_readers();
            }
            entry.active_readers.push(Arc::downgrade(task));
        }

        self.registrations += 1;
        if let Some(interval) = self.prune_interval {
            if self.registrations % interval == 0 {
                self.prune();
            }
        }

        predecessors.into_values().collect()
    }

    /// Evict entries that can no longer produce edges. Returns how many were
    /// removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale());
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "pruned stale ledger entries");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Node {
        id: TaskId,
        done: AtomicBool,
    }

    impl Node {
        fn new(id: u64) -> Arc<Self> {
            Arc::new(Self {
                id: TaskId::new(id),
                done: AtomicBool::new(false),
            })
        }

        fn finish(&self) {
            self.done.store(true, Ordering::Release);
        }
    }

    impl LedgerNode for Node {
        fn node_id(&self) -> TaskId {
            self.id
        }

        fn is_completed(&self) -> bool {
            self.done.load(Ordering::Acquire)
        }
    }

    fn set(ids: &[u64]) -> BTreeSet<ResourceId> {
        ids.iter().copied().map(ResourceId::new).collect()
    }

    fn ids(preds: &[Arc<Node>]) -> Vec<u64> {
        preds.iter().map(|p| p.id.get()).collect()
    }

    #[test]
    fn empty_sets_produce_no_edges() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        assert!(ledger.register(&a, &set(&[]), &set(&[])).is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn writer_waits_for_previous_writer() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        let b = Node::new(2);
        ledger.register(&a, &set(&[7]), &set(&[]));
        assert_eq!(ids(&ledger.register(&b, &set(&[7]), &set(&[]))), vec![1]);
    }

    #[test]
    fn readers_share_but_writer_waits_for_all_of_them() {
        let mut ledger = ResourceLedger::default();
        let w = Node::new(1);
        let r1 = Node::new(2);
        let r2 = Node::new(3);
        let w2 = Node::new(4);

        ledger.register(&w, &set(&[5]), &set(&[]));
        assert_eq!(ids(&ledger.register(&r1, &set(&[]), &set(&[5]))), vec![1]);
        assert_eq!(ids(&ledger.register(&r2, &set(&[]), &set(&[5]))), vec![1]);
        assert_eq!(ids(&ledger.register(&w2, &set(&[5]), &set(&[]))), vec![1, 2, 3]);
    }

    #[test]
    fn new_writer_supersedes_readers() {
        let mut ledger = ResourceLedger::default();
        let r = Node::new(1);
        let w = Node::new(2);
        let r2 = Node::new(3);

        ledger.register(&r, &set(&[]), &set(&[9]));
        ledger.register(&w, &set(&[9]), &set(&[]));
        // Only the writer is relevant to a later reader.
        assert_eq!(ids(&ledger.register(&r2, &set(&[]), &set(&[9]))), vec![2]);
    }

    #[test]
    fn completed_tasks_produce_no_edges() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        let b = Node::new(2);
        ledger.register(&a, &set(&[1]), &set(&[]));
        a.finish();
        assert!(ledger.register(&b, &set(&[1]), &set(&[1])).is_empty());
    }

    #[test]
    fn dropped_tasks_produce_no_edges() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        ledger.register(&a, &set(&[1]), &set(&[]));
        drop(a);
        let b = Node::new(2);
        assert!(ledger.register(&b, &set(&[1]), &set(&[])).is_empty());
    }

    #[test]
    fn read_and_write_of_same_resource_is_not_self_dependent() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        assert!(ledger.register(&a, &set(&[3]), &set(&[3])).is_empty());

        let entry = ledger.entry(ResourceId::new(3)).expect("entry exists");
        assert_eq!(entry.live_writer().map(|w| w.id.get()), Some(1));
        assert_eq!(entry.live_readers().count(), 0);
    }

    #[test]
    fn duplicate_predecessor_across_resources_collapses() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        let b = Node::new(2);
        ledger.register(&a, &set(&[1, 2]), &set(&[]));
        assert_eq!(ids(&ledger.register(&b, &set(&[1]), &set(&[2]))), vec![1]);
    }

    #[test]
    fn prune_evicts_only_stale_entries() {
        let mut ledger = ResourceLedger::default();
        let a = Node::new(1);
        let b = Node::new(2);
        ledger.register(&a, &set(&[1]), &set(&[]));
        ledger.register(&b, &set(&[2]), &set(&[]));
        a.finish();

        assert_eq!(ledger.prune(), 1);
        assert!(ledger.entry(ResourceId::new(1)).is_none());
        assert!(ledger.entry(ResourceId::new(2)).is_some());
    }

    #[test]
    fn periodic_prune_runs_on_interval() {
        let mut ledger = ResourceLedger::new(Some(2));
        let a = Node::new(1);
        ledger.register(&a, &set(&[1]), &set(&[]));
        a.finish();
        let b = Node::new(2);
        ledger.register(&b, &set(&[2]), &set(&[]));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn finished_readers_are_swept_as_list_grows() {
        let mut ledger = ResourceLedger::default();
        let mut readers = Vec::new();
        for id in 0..64 {
            let r = Node::new(id);
            ledger.register(&r, &set(&[]), &set(&[4]));
            r.finish();
            readers.push(r);
        }
        let entry = ledger.entry(ResourceId::new(4)).expect("entry exists");
        assert!(entry.active_readers.len() < 64);
        assert_eq!(entry.live_readers().count(), 0);
    }
}
