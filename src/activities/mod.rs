//! Activity Surface (C11, `SPEC_FULL.md` §4.10).
//!
//! Every call that crosses from deterministic orchestration code into a
//! collaborator (LLM agent, durable runtime, VCS backend, process/OS layer)
//! is an Activity: inputs and outputs are plain, serializable-by-value data,
//! never handles or file descriptors, so a durable-runtime collaborator can
//! persist and replay them.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reservation::Reservation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapCellInput {
    pub cell_id: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapCellOutput {
    pub cell_id: String,
    pub port: u16,
    pub worktree: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownCellInput {
    pub cell_id: String,
    pub port: u16,
    pub worktree: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutePromptInput {
    pub cell_id: String,
    pub prompt: String,
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutePromptOutput {
    pub session_id: String,
    pub parts: Vec<String>,
    pub modified_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTestsInput {
    pub cell_id: String,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunTestsOutput {
    pub exit_code: i32,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub output: String,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitChangesInput {
    pub cell_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitChangesOutput {
    pub files: Vec<String>,
    pub commit_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintFilesInput {
    pub cell_id: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LintFilesOutput {
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireLocksInput {
    pub agent: String,
    pub patterns: Vec<String>,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseLocksInput {
    pub agent_or_reservations: Vec<String>,
}

/// The collaborator-facing Activity Surface. Every method is individually
/// retryable (idempotent ones up to 3 attempts with exponential backoff,
/// non-idempotent ones once) by [`crate::activities::retry::with_retry`]
/// callers, not by the trait itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivitySurface: Send + Sync {
    async fn bootstrap_cell(&self, input: BootstrapCellInput) -> Result<BootstrapCellOutput>;
    async fn teardown_cell(&self, input: TeardownCellInput) -> Result<()>;
    async fn execute_prompt(&self, input: ExecutePromptInput) -> Result<ExecutePromptOutput>;
    async fn run_tests(&self, input: RunTestsInput) -> Result<RunTestsOutput>;
    async fn commit_changes(&self, input: CommitChangesInput) -> Result<CommitChangesOutput>;
    async fn revert_changes(&self, cell_id: String) -> Result<()>;
    async fn lint_files(&self, input: LintFilesInput) -> Result<LintFilesOutput>;
    async fn acquire_locks(&self, input: AcquireLocksInput) -> Result<Vec<Reservation>>;
    async fn release_locks(&self, input: ReleaseLocksInput) -> Result<()>;
}

pub mod retry;
pub use retry::Idempotency;
