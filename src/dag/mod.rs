//! DAG Scheduler (C9, `SPEC_FULL.md` §4.8): topological ordering of named
//! tasks with declared dependencies, parallel dispatch of ready tasks, and
//! checkpointed resume after a human-intervention pause.

mod graph;
mod scheduler;

pub use graph::{DagCommand, DagTask, TaskGraph};
pub use scheduler::{DagCheckpoint, DagResult, DagScheduler, DagTaskRunner, FailedTask};
