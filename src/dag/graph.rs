//! DAG Task Graph and toposort (`SPEC_FULL.md` §3, §4.8).

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::tcr::Task;

/// A DAG task's invocation: either an opaque shell command or a nested TCR
/// task spec (`SPEC_FULL.md` §6's "Command is either a shell invocation
/// string or a nested TCR Task reference").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DagCommand {
    Shell(String),
    Tcr(Box<Task>),
}

/// One node of a [`TaskGraph`]. Invariant I3: `deps` names must all resolve
/// to sibling tasks, and the induced graph must be acyclic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagTask {
    pub name: String,
    pub command: DagCommand,
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGraph {
    pub workflow_id: String,
    pub branch: String,
    pub tasks: Vec<DagTask>,
}

impl TaskGraph {
    /// Kahn's-algorithm topological sort. Tasks with no incoming or outgoing
    /// edges are disconnected roots and are prepended, unordered, ahead of
    /// the sorted dependency chain (§4.8 step 1).
    pub fn toposort(&self) -> Result<Vec<String>> {
        let names: HashSet<&str> = self.tasks.iter().map(|t| t.name.as_str()).collect();
        for task in &self.tasks {
            for dep in &task.deps {
                if !names.contains(dep.as_str()) {
                    return Err(CoreError::CycleDetected {
                        nodes: vec![task.name.clone(), dep.clone()],
                    });
                }
            }
        }

        let mut indegree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in &self.tasks {
            indegree.entry(task.name.as_str()).or_insert(0);
            for dep in &task.deps {
                *indegree.entry(task.name.as_str()).or_insert(0) += 1;
                dependents.entry(dep.as_str()).or_default().push(task.name.as_str());
            }
        }

        let (mut roots, mut rest): (Vec<&str>, VecDeque<&str>) = (Vec::new(), VecDeque::new());
        for task in &self.tasks {
            if task.deps.is_empty() {
                roots.push(task.name.as_str());
            } else {
                rest.push_back(task.name.as_str());
            }
        }
        roots.sort_unstable();

        let mut queue: VecDeque<&str> = roots.iter().copied().collect();
        let mut order: Vec<String> = Vec::with_capacity(self.tasks.len());
        let mut remaining_indegree = indegree.clone();
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name) {
                continue;
            }
            order.push(name.to_string());
            if let Some(children) = dependents.get(name) {
                let mut ready = Vec::new();
                for child in children {
                    let entry = remaining_indegree.entry(child).or_insert(0);
                    *entry = entry.saturating_sub(1);
                    if *entry == 0 {
                        ready.push(*child);
                    }
                }
                ready.sort_unstable();
                for r in ready {
                    queue.push_back(r);
                }
            }
        }

        if order.len() != self.tasks.len() {
            let unresolved: Vec<String> = self
                .tasks
                .iter()
                .map(|t| t.name.clone())
                .filter(|n| !order.contains(n))
                .collect();
            return Err(CoreError::CycleDetected { nodes: unresolved });
        }

        let _ = rest;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(name: &str, deps: &[&str]) -> DagTask {
        DagTask {
            name: name.to_string(),
            command: DagCommand::Shell(format!("echo {name}")),
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn diamond_dependency_orders_prepare_before_both_builds() {
        let graph = TaskGraph {
            workflow_id: "wf".to_string(),
            branch: "main".to_string(),
            tasks: vec![
                shell("deploy", &["build1", "build2"]),
                shell("build2", &["prepare"]),
                shell("build1", &["prepare"]),
                shell("prepare", &[]),
            ],
        };
        let order = graph.toposort().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("prepare") < pos("build1"));
        assert!(pos("prepare") < pos("build2"));
        assert!(pos("build1") < pos("deploy"));
        assert!(pos("build2") < pos("deploy"));
    }

    #[test]
    fn cycle_is_rejected_before_any_task_runs() {
        let graph = TaskGraph {
            workflow_id: "wf".to_string(),
            branch: "main".to_string(),
            tasks: vec![shell("a", &["c"]), shell("b", &["a"]), shell("c", &["b"])],
        };
        assert!(matches!(
            graph.toposort(),
            Err(CoreError::CycleDetected { .. })
        ));
    }
}
