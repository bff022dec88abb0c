// src/harness/workload.rs

//! Expanding a validated workload into the concrete submissions the harness
//! makes, in order.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use crate::config::{TaskSpec, WorkloadFile};
use crate::engine::Queue;
use crate::graph::TaskId;
use crate::types::ResourceId;

/// Maps resource names from the workload file to [`ResourceId`]s, in order of
/// first appearance.
#[derive(Debug, Default)]
pub struct ResourceInterner {
    ids: HashMap<String, ResourceId>,
}

impl ResourceInterner {
    pub fn intern(&mut self, name: &str) -> ResourceId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = ResourceId::new(self.ids.len() as u64);
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One submission the harness will make.
#[derive(Debug, Clone)]
pub struct Submission {
    pub label: String,
    pub writes: Vec<ResourceId>,
    pub reads: Vec<ResourceId>,
    pub sleep: Duration,
    pub panic: bool,
}

impl Submission {
    fn from_spec(spec: &TaskSpec, label: String, resources: &mut ResourceInterner) -> Self {
        Self {
            label,
            writes: spec.writes.iter().map(|r| resources.intern(r)).collect(),
            reads: spec.reads.iter().map(|r| resources.intern(r)).collect(),
            sleep: Duration::from_millis(spec.sleep_ms),
            panic: spec.panic,
        }
    }

    /// Hand this submission to `queue`.
    pub fn submit_to(self, queue: &Queue) -> TaskId {
        let Submission {
            label,
            writes,
            reads,
            sleep,
            panic,
        } = self;
        queue.submit(
            move || {
                if !sleep.is_zero() {
                    thread::sleep(sleep);
                }
                if panic {
                    panic!("task '{label}' panicked on request");
                }
            },
            writes,
            reads,
        )
    }
}

/// Expand iterations and repeats into the ordered submission list.
///
/// Labels are the task name, suffixed with a running index when the same task
/// is submitted more than once.
pub fn expand(workload: &WorkloadFile) -> (Vec<Submission>, ResourceInterner) {
    let mut resources = ResourceInterner::default();
    let mut submissions = Vec::with_capacity(workload.total_submissions());
    let mut counters: HashMap<&str, usize> = HashMap::new();

    for _ in 0..workload.queue.iterations {
        for spec in &workload.task {
            let copies = spec.repeat * workload.queue.iterations;
            for _ in 0..spec.repeat {
                let n = counters.entry(spec.name.as_str()).or_insert(0);
                let label = if copies > 1 {
                    format!("{}[{}]", spec.name, n)
                } else {
                    spec.name.clone()
                };
                *n += 1;
                submissions.push(Submission::from_spec(spec, label, &mut resources));
            }
        }
    }

    (submissions, resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawWorkloadFile;

    fn workload(src: &str) -> WorkloadFile {
        let raw: RawWorkloadFile = toml::from_str(src).expect("toml parses");
        WorkloadFile::try_from(raw).expect("workload validates")
    }

    #[test]
    fn resources_are_interned_in_first_seen_order() {
        let mut interner = ResourceInterner::default();
        assert_eq!(interner.intern("b"), ResourceId::new(0));
        assert_eq!(interner.intern("a"), ResourceId::new(1));
        assert_eq!(interner.intern("b"), ResourceId::new(0));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn repeats_and_iterations_expand_in_order() {
        let wl = workload(
            r#"
[queue]
iterations = 2

[[task]]
name = "w"
writes = ["x"]
repeat = 2

[[task]]
name = "r"
reads = ["x"]
"#,
        );
        let (subs, resources) = expand(&wl);
        let labels: Vec<_> = subs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["w[0]", "w[1]", "r[0]", "w[2]", "w[3]", "r[1]"]);
        assert_eq!(resources.len(), 1);
    }
}
