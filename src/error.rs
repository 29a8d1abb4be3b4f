//! Structural error taxonomy for the workflow execution core.
//!
//! Every kind here is a tagged variant, not a string, so orchestration code can
//! match on it to decide fix/regen/abort routing (see [`crate::tcr`]) rather than
//! parsing messages. See `SPEC_FULL.md` §7 for the surfacing table.

use thiserror::Error;

use crate::cell::AssemblyStep;
use crate::tcr::GateKind;

/// Main error type for the core, with structured context and proper chaining
/// via `thiserror`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A Cell Assembly step failed; `step` identifies how much of the saga to undo.
    #[error("cell boot failed at step {step:?}: {message}")]
    CellBootError {
        step: AssemblyStep,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The Port Registry's configured range is fully allocated.
    #[error("port range exhausted")]
    PortsExhausted,

    /// An overlapping reservation blocks a new `reserve` request.
    #[error("conflict detected ({kind:?}) held by {holders:?}")]
    ConflictDetected {
        holders: Vec<String>,
        kind: crate::reservation::ConflictKind,
    },

    /// A Gate Chain check, or a TCR gate itself, failed.
    #[error("gate {gate:?} failed ({kind}): {feedback}")]
    GateError {
        gate: GateKind,
        kind: String,
        feedback: String,
    },

    /// The DAG's dependency graph contains a cycle.
    #[error("cycle detected among nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<String> },

    /// An activity exceeded its `StartToClose` or `Heartbeat` timeout.
    #[error("activity timed out")]
    ActivityTimeout,

    /// A cancellation signal was observed; terminal, drives saga teardown.
    #[error("cancelled")]
    Cancelled,

    /// The DAG scheduler made no progress although tasks remain; indicates a bug
    /// (toposort should make this unreachable).
    #[error("dag scheduler stalled with tasks still pending")]
    Stalled,

    /// IO failure from a collaborator boundary (process spawn, filesystem).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git/worktree shell-out failure.
    #[error("git error: {message}")]
    Git {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be parsed or contained an invalid value.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Generic error for cases not covered above.
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn git<S: Into<String>>(message: S) -> Self {
        Self::Git {
            message: message.into(),
            source: None,
        }
    }

    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    pub fn gate(gate: GateKind, kind: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self::GateError {
            gate,
            kind: kind.into(),
            feedback: feedback.into(),
        }
    }

    /// Whether an Activity retry policy may still recover from this error
    /// (see `SPEC_FULL.md` §7's Recoverable column).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ActivityTimeout | Self::ConflictDetected { .. } | Self::Io(_)
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PortsExhausted | Self::CycleDetected { .. } | Self::Stalled => {
                ErrorSeverity::Critical
            }
            Self::CellBootError { .. } | Self::Cancelled => ErrorSeverity::High,
            Self::GateError { .. } | Self::Git { .. } => ErrorSeverity::Medium,
            Self::ConflictDetected { .. } | Self::ActivityTimeout => ErrorSeverity::Low,
            Self::Io(_) | Self::Configuration { .. } | Self::Other { .. } => {
                ErrorSeverity::Medium
            }
        }
    }
}

/// Error severity levels, used only for logging emphasis; never part of
/// control flow (control flow matches on the `CoreError` variant itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
