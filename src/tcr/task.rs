//! TCR data model (`SPEC_FULL.md` §3, §6).

use serde::{Deserialize, Serialize};

/// The six gates of the TCR state machine, in fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    GenTest,
    LintTest,
    VerifyRED,
    GenImpl,
    VerifyGREEN,
    MultiReview,
}

impl GateKind {
    pub const ALL: [GateKind; 6] = [
        GateKind::GenTest,
        GateKind::LintTest,
        GateKind::VerifyRED,
        GateKind::GenImpl,
        GateKind::VerifyGREEN,
        GateKind::MultiReview,
    ];

    /// Gates 1-3 are fatal on failure (no retry); gates 4-6 route through
    /// fix/regen.
    pub fn retries_on_failure(&self) -> bool {
        matches!(self, Self::GenImpl | Self::VerifyGREEN | Self::MultiReview)
    }
}

/// A unit of TCR work. Immutable after submission (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub work_directory: String,
    pub branch: String,
    pub reviewer_count: u32,
    pub max_retries: u32,
    pub max_fix_attempts: u32,
}

impl Task {
    pub fn builder(task_id: impl Into<String>, acceptance_criteria: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(task_id, acceptance_criteria)
    }
}

/// Builder applying the defaults from `SPEC_FULL.md` §6: branch "main",
/// reviewer-count 2, max-retries 2, max-fix-attempts 5.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(task_id: impl Into<String>, acceptance_criteria: impl Into<String>) -> Self {
        Self {
            task: Task {
                task_id: task_id.into(),
                title: String::new(),
                description: String::new(),
                acceptance_criteria: acceptance_criteria.into(),
                work_directory: ".".to_string(),
                branch: "main".to_string(),
                reviewer_count: 2,
                max_retries: 2,
                max_fix_attempts: 5,
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.task.description = description.into();
        self
    }

    pub fn work_directory(mut self, path: impl Into<String>) -> Self {
        self.task.work_directory = path.into();
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.task.branch = branch.into();
        self
    }

    pub fn reviewer_count(mut self, count: u32) -> Self {
        self.task.reviewer_count = count.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.task.max_retries = n;
        self
    }

    pub fn max_fix_attempts(mut self, n: u32) -> Self {
        self.task.max_fix_attempts = n;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// A single gate's outcome. Append-only; a TCR run produces an ordered
/// sequence of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_name: GateKind,
    pub passed: bool,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub files_changed: Vec<String>,
    pub feedback: Option<String>,
}

/// Output surface for a completed TCR run (`SPEC_FULL.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcrResult {
    pub success: bool,
    pub gate_history: Vec<GateResult>,
    pub files_changed: Vec<String>,
    pub commit_id: Option<String>,
    pub abort_reason: Option<String>,
}
