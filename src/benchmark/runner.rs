//! Parallel benchmark runner (C10, `SPEC_FULL.md` §4.9): N independent TCR
//! orchestrations, each with its own cell-id and worktree, bounded by an
//! optional concurrency cap.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::tcr::{TcrOrchestrator, TcrResult};
use crate::tcr::Task;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub index: usize,
    pub success: bool,
    pub duration_ms: u64,
    pub result: TcrResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub successes: u32,
    pub failures: u32,
    pub total_duration_ms: u64,
    pub per_run: Vec<RunOutcome>,
}

/// Run every task in `tasks` as an independent TCR orchestration. `orchestrator`
/// is shared across runs (each run gets its own cell via a fresh cell-id, per
/// §4.9); `concurrency` caps the number of runs in flight at once, unbounded
/// when `None`.
pub async fn run_benchmark(
    orchestrator: Arc<TcrOrchestrator>,
    tasks: Vec<Task>,
    concurrency: Option<usize>,
) -> BenchmarkResult {
    let started = Instant::now();
    let cap = concurrency.unwrap_or(tasks.len().max(1));

    let mut per_run: Vec<RunOutcome> = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| {
            let orchestrator = orchestrator.clone();
            async move {
                let run_started = Instant::now();
                let result = orchestrator.run(task).await;
                let duration_ms = run_started.elapsed().as_millis() as u64;
                let (success, result) = match result {
                    Ok(r) => (r.success, r),
                    Err(e) => (
                        false,
                        TcrResult {
                            success: false,
                            gate_history: Vec::new(),
                            files_changed: Vec::new(),
                            commit_id: None,
                            abort_reason: Some(e.to_string()),
                        },
                    ),
                };
                RunOutcome {
                    index,
                    success,
                    duration_ms,
                    result,
                }
            }
        })
        .buffer_unordered(cap)
        .collect()
        .await;

    per_run.sort_by_key(|r| r.index);
    let successes = per_run.iter().filter(|r| r.success).count() as u32;
    let failures = per_run.len() as u32 - successes;

    BenchmarkResult {
        successes,
        failures,
        total_duration_ms: started.elapsed().as_millis() as u64,
        per_run,
    }
}
