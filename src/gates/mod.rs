//! Gate Chain — honesty and integrity enforcement (C7, `SPEC_FULL.md` §4.6).
//!
//! An ordered, fixed sequence of integrity checks run around the six TCR
//! gates. Expressed, per §9's design note, as a sum type over check kinds
//! plus a single `check` function rather than a list of callable objects.

mod chain;
mod drift;
mod hard_work;
mod honesty;
mod immutability;
mod requirements;

pub use chain::{GateChain, GateContext};
pub use honesty::SUCCESS_KEYWORDS;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The five integrity checks, invoked in this fixed order around every TCR
/// gate evaluation that the check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityCheck {
    RequirementsVerification,
    TestImmutability,
    EmpiricalHonesty,
    HardWorkEnforcement,
    RequirementDriftDetection,
}

impl IntegrityCheck {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RequirementsVerification => "RequirementsVerification",
            Self::TestImmutability => "TestImmutability",
            Self::EmpiricalHonesty => "EmpiricalHonesty",
            Self::HardWorkEnforcement => "HardWorkEnforcement",
            Self::RequirementDriftDetection => "RequirementDriftDetection",
        }
    }
}

/// Structured feedback produced by a failed integrity check, routed back to
/// the agent as targeted-fix seed material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateError {
    pub kind: IntegrityCheck,
    pub title: String,
    pub message: String,
    pub suggested_actions: Vec<String>,
    pub technical_details: String,
}

impl GateError {
    pub fn into_core_error(self, gate: crate::tcr::GateKind) -> CoreError {
        CoreError::GateError {
            gate,
            kind: self.kind.label().to_string(),
            feedback: self.message,
        }
    }
}

pub type CheckResult = std::result::Result<(), GateError>;

/// Common interface for a single integrity check (`SPEC_FULL.md` §4.6:
/// "Each Gate exposes `check(context) -> ok | GateError`").
pub trait Gate: Send + Sync {
    fn kind(&self) -> IntegrityCheck;
    fn check(&self, ctx: &GateContext) -> CheckResult;
}

