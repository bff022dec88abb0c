// src/harness/plan.rs

//! Dry-run dependency plan.
//!
//! Replays a workload's submissions through a [`ResourceLedger`] over inert
//! nodes that never complete, which yields exactly the edges the queue would
//! create if every task were still running when the next one arrives. The
//! result is loaded into a `petgraph` graph to order it and to find the
//! critical path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::config::WorkloadFile;
use crate::errors::{QueueError, Result};
use crate::graph::{LedgerNode, ResourceLedger, ResourceSets, TaskId};
use crate::harness::workload::expand;

#[derive(Debug)]
struct PlanNode {
    id: TaskId,
}

impl LedgerNode for PlanNode {
    fn node_id(&self) -> TaskId {
        self.id
    }

    fn is_completed(&self) -> bool {
        false
    }
}

/// One planned submission and the submissions it waits for.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub label: String,
    pub sleep: Duration,
    /// Indices into [`Plan::steps`].
    pub predecessors: Vec<usize>,
}

/// Static dependency graph of a workload.
#[derive(Debug)]
pub struct Plan {
    steps: Vec<PlanStep>,
    graph: DiGraph<usize, ()>,
    resources: usize,
}

impl Plan {
    pub fn build(workload: &WorkloadFile) -> Result<Self> {
        let (submissions, resources) = expand(workload);
        let mut ledger: ResourceLedger<PlanNode> = ResourceLedger::new(None);
        // Keeps every node alive; the ledger only holds weak references.
        let mut nodes: Vec<Arc<PlanNode>> = Vec::with_capacity(submissions.len());
        let mut steps = Vec::with_capacity(submissions.len());

        for (index, sub) in submissions.into_iter().enumerate() {
            let node = Arc::new(PlanNode {
                id: TaskId::new(index as u64),
            });
            let sets = ResourceSets::new(sub.writes, sub.reads);
            let predecessors: Vec<usize> = ledger
                .register(&node, sets.writes(), sets.reads())
                .iter()
                .map(|p| p.id.get() as usize)
                .collect();
            nodes.push(node);
            steps.push(PlanStep {
                label: sub.label,
                sleep: sub.sleep,
                predecessors,
            });
        }

        let mut graph = DiGraph::with_capacity(steps.len(), 0);
        let indices: Vec<NodeIndex> = (0..steps.len()).map(|i| graph.add_node(i)).collect();
        for (index, step) in steps.iter().enumerate() {
            for &pred in &step.predecessors {
                graph.add_edge(indices[pred], indices[index], ());
            }
        }

        Ok(Self {
            steps,
            graph,
            resources: resources.len(),
        })
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Longest chain of summed task durations: a lower bound on wall time
    /// with unlimited workers.
    pub fn critical_path(&self) -> Result<Duration> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            let index = self.graph[cycle.node_id()];
            QueueError::ConfigError(format!(
                "dependency plan has a cycle through '{}'",
                self.steps[index].label
            ))
        })?;

        let mut finish = vec![Duration::ZERO; self.steps.len()];
        for node in order {
            let index = self.graph[node];
            let step = &self.steps[index];
            let start = step
                .predecessors
                .iter()
                .map(|&p| finish[p])
                .max()
                .unwrap_or(Duration::ZERO);
            finish[index] = start + step.sleep;
        }

        Ok(finish.into_iter().max().unwrap_or(Duration::ZERO))
    }

    /// Length of the longest predecessor chain, counted in tasks.
    pub fn depth(&self) -> usize {
        let mut depth = vec![0usize; self.steps.len()];
        // Predecessors always have smaller indices, so index order is a
        // topological order.
        for (index, step) in self.steps.iter().enumerate() {
            depth[index] = 1 + step.predecessors.iter().map(|&p| depth[p]).max().unwrap_or(0);
        }
        depth.into_iter().max().unwrap_or(0)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "plan: {} submissions, {} resources, {} edges, depth {}",
            self.steps.len(),
            self.resources,
            self.edge_count(),
            self.depth()
        )?;
        for step in &self.steps {
            if step.predecessors.is_empty() {
                writeln!(f, "  - {} ({}ms): ready", step.label, step.sleep.as_millis())?;
            } else {
                let after: Vec<&str> = step
                    .predecessors
                    .iter()
                    .map(|&p| self.steps[p].label.as_str())
                    .collect();
                writeln!(
                    f,
                    "  - {} ({}ms): after {:?}",
                    step.label,
                    step.sleep.as_millis(),
                    after
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawWorkloadFile;

    fn plan(src: &str) -> Plan {
        let raw: RawWorkloadFile = toml::from_str(src).expect("toml parses");
        let workload = WorkloadFile::try_from(raw).expect("workload validates");
        Plan::build(&workload).expect("plan builds")
    }

    #[test]
    fn readers_fan_out_and_writer_joins() {
        let p = plan(
            r#"
[[task]]
name = "init"
writes = ["x"]
sleep_ms = 10

[[task]]
name = "r1"
reads = ["x"]
sleep_ms = 30

[[task]]
name = "r2"
reads = ["x"]
sleep_ms = 5

[[task]]
name = "fin"
writes = ["x"]
sleep_ms = 1
"#,
        );

        assert_eq!(p.steps()[1].predecessors, vec![0]);
        assert_eq!(p.steps()[2].predecessors, vec![0]);
        // The finishing writer still lists `init`; it is a redundant but
        // harmless edge.
        assert_eq!(p.steps()[3].predecessors, vec![0, 1, 2]);
        assert_eq!(p.edge_count(), 5);
        assert_eq!(p.depth(), 3);
        assert_eq!(p.critical_path().unwrap(), Duration::from_millis(41));
    }

    #[test]
    fn disjoint_tasks_have_no_edges() {
        let p = plan(
            r#"
[[task]]
name = "a"
writes = ["x"]
sleep_ms = 20

[[task]]
name = "b"
writes = ["y"]
sleep_ms = 20
"#,
        );
        assert_eq!(p.edge_count(), 0);
        assert_eq!(p.critical_path().unwrap(), Duration::from_millis(20));
        assert!(p.to_string().contains("b (20ms): ready"));
    }
}
