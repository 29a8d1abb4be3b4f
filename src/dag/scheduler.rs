//! DAG Scheduler (C9, `SPEC_FULL.md` §4.8): topological dispatch with
//! parallel execution of ready tasks and checkpointed resume after a
//! strict-mode failure pause.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

use super::graph::{DagTask, TaskGraph};

/// Executes a single DAG task's command. An out-of-scope collaborator
/// concern: the core only knows that a task either completed or failed, not
/// how shell invocations or nested TCR runs are actually carried out.
#[async_trait]
pub trait DagTaskRunner: Send + Sync {
    async fn run(&self, task: &DagTask) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagResult {
    pub completed: Vec<String>,
    pub failed: Vec<FailedTask>,
    pub duration_ms: u64,
}

/// Checkpoint representable purely as the ordered sequence of completed task
/// names (`SPEC_FULL.md` §4.8: "persisted state... purely as the ordered
/// sequence of completed task names").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagCheckpoint {
    pub completed: Vec<String>,
}

pub struct DagScheduler<'a> {
    graph: &'a TaskGraph,
    runner: &'a dyn DagTaskRunner,
    strict: bool,
    fix_signal: Option<async_channel::Receiver<String>>,
}

impl<'a> DagScheduler<'a> {
    pub fn new(graph: &'a TaskGraph, runner: &'a dyn DagTaskRunner) -> Self {
        Self {
            graph,
            runner,
            strict: true,
            fix_signal: None,
        }
    }

    /// Non-strict mode records failures and keeps the rest of the DAG
    /// running instead of pausing for `FixApplied`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn fix_signal(mut self, rx: async_channel::Receiver<String>) -> Self {
        self.fix_signal = Some(rx);
        self
    }

    /// Run to completion, optionally resuming from a prior checkpoint's
    /// completed-task set.
    pub async fn run(&self, checkpoint: Option<DagCheckpoint>) -> Result<DagResult> {
        let started = Instant::now();
        let order = self.graph.toposort()?;
        let by_name: std::collections::HashMap<&str, &DagTask> =
            self.graph.tasks.iter().map(|t| (t.name.as_str(), t)).collect();

        let mut completed: HashSet<String> = checkpoint
            .map(|c| c.completed.into_iter().collect())
            .unwrap_or_default();
        let mut failed: Vec<FailedTask> = Vec::new();
        let mut pending_names: HashSet<String> = HashSet::new();
        let mut futures: Vec<Pin<Box<dyn Future<Output = (String, Result<()>)> + Send + '_>>> = Vec::new();

        loop {
            if completed.len() == order.len() {
                break;
            }

            let mut started_any = false;
            let mut ready: Vec<&str> = order
                .iter()
                .map(|n| n.as_str())
                .filter(|n| !completed.contains(*n) && !pending_names.contains(*n))
                .filter(|n| by_name[n].deps.iter().all(|d| completed.contains(d)))
                .collect();
            ready.sort_unstable();

            for name in ready {
                started_any = true;
                pending_names.insert(name.to_string());
                let task = by_name[name];
                let owned_name = name.to_string();
                futures.push(Box::pin(async move {
                    let result = self.runner.run(task).await;
                    (owned_name, result)
                }));
            }

            if futures.is_empty() {
                if pending_names.is_empty() && completed.len() < order.len() {
                    return Err(CoreError::Stalled);
                }
                if !started_any {
                    break;
                }
                continue;
            }

            // Deterministic selector: futures are always pushed in
            // name-ascending order, so `select_all` resolves ties by the
            // lexicographically smallest ready completion (§4.8).
            let (outcome, _index, remaining) = futures::future::select_all(futures).await;
            futures = remaining;
            let (name, result) = outcome;
            pending_names.remove(&name);

            match result {
                Ok(()) => {
                    info!(task = %name, "dag task completed");
                    completed.insert(name);
                }
                Err(e) => {
                    warn!(task = %name, error = %e, "dag task failed");
                    failed.push(FailedTask {
                        name: name.clone(),
                        reason: e.to_string(),
                    });
                    if self.strict {
                        let Some(rx) = &self.fix_signal else {
                            return Err(CoreError::other(format!(
                                "task {name} failed in strict mode with no FixApplied signal configured"
                            )));
                        };
                        info!(task = %name, "dag paused, awaiting FixApplied");
                        match rx.recv().await {
                            Ok(_) => {
                                info!(task = %name, "FixApplied received, resuming");
                                failed.retain(|f| f.name != name);
                            }
                            Err(_) => {
                                return Err(CoreError::other("FixApplied channel closed"));
                            }
                        }
                    }
                }
            }
        }

        Ok(DagResult {
            completed: order.into_iter().filter(|n| completed.contains(n)).collect(),
            failed,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::DagCommand;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct AlwaysOk;

    #[async_trait]
    impl DagTaskRunner for AlwaysOk {
        async fn run(&self, _task: &DagTask) -> Result<()> {
            Ok(())
        }
    }

    fn shell(name: &str, deps: &[&str]) -> DagTask {
        DagTask {
            name: name.to_string(),
            command: DagCommand::Shell(format!("echo {name}")),
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn diamond_dag_completes_all_four_tasks() {
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
        let runner = AlwaysOk;
        let scheduler = DagScheduler::new(&graph, &runner);
        let result = scheduler.run(None).await.unwrap();
        assert_eq!(result.completed.len(), 4);
        assert!(result.failed.is_empty());
    }

    struct CountingRunner(Arc<AtomicUsize>);

    #[async_trait]
    impl DagTaskRunner for CountingRunner {
        async fn run(&self, _task: &DagTask) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn resumes_from_a_checkpoint_without_rerunning_completed_tasks() {
        let graph = TaskGraph {
            workflow_id: "wf".to_string(),
            branch: "main".to_string(),
            tasks: vec![shell("b", &["a"]), shell("a", &[])],
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = CountingRunner(calls.clone());
        let scheduler = DagScheduler::new(&graph, &runner);
        let checkpoint = DagCheckpoint {
            completed: vec!["a".to_string()],
        };
        let result = scheduler.run(Some(checkpoint)).await.unwrap();
        assert_eq!(result.completed, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
