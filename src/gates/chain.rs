//! The Gate Chain itself: a fixed-order composition of the five integrity
//! checks (`SPEC_FULL.md` §4.6).

use std::collections::HashMap;

use super::drift::RequirementDriftGate;
use super::hard_work::HardWorkEnforcementGate;
use super::honesty::EmpiricalHonestyGate;
use super::immutability::TestImmutabilityGate;
use super::requirements::RequirementsVerificationGate;
use super::{Gate, GateError};

/// Data available to integrity checks. Populated entirely from Activity
/// results by the orchestrator; no check performs I/O itself, keeping the
/// gate chain replay-safe.
#[derive(Debug, Clone, Default)]
pub struct GateContext {
    pub acceptance_criteria: String,
    pub requirements_restatement: Option<String>,
    pub test_file_hashes_before: HashMap<String, String>,
    pub test_file_hashes_after: HashMap<String, String>,
    pub claim_text: Option<String>,
    pub empirical_exit_code: Option<i32>,
    pub empirical_failures: Vec<String>,
    pub implementation_snippets: Vec<String>,
    pub generated_output_units: u64,
    pub drift_alignment_score: Option<f32>,
}

/// Ordered composition of the five integrity checks. Composition is a plain
/// `Vec` of gate kinds in the fixed order (`SPEC_FULL.md` §9's design note),
/// not a list of independently-configured callable objects.
pub struct GateChain {
    gates: Vec<Box<dyn Gate>>,
}

impl Default for GateChain {
    fn default() -> Self {
        Self {
            gates: vec![
                Box::new(RequirementsVerificationGate),
                Box::new(TestImmutabilityGate),
                Box::new(EmpiricalHonestyGate),
                Box::new(HardWorkEnforcementGate),
                Box::new(RequirementDriftGate::default()),
            ],
        }
    }
}

impl GateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every check in order, short-circuiting on the first failure
    /// (mirrors the orchestrator's routing: the first failing check's
    /// feedback seeds the next targeted fix).
    pub fn run(&self, ctx: &GateContext) -> Result<(), GateError> {
        for gate in &self.gates {
            gate.check(ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_passes_every_check() {
        let chain = GateChain::new();
        let ctx = GateContext {
            requirements_restatement: Some(String::new()),
            ..GateContext::default()
        };
        assert!(chain.run(&ctx).is_ok());
    }

    #[test]
    fn dishonest_claim_short_circuits_the_chain() {
        let chain = GateChain::new();
        let ctx = GateContext {
            requirements_restatement: Some(String::new()),
            claim_text: Some("all tests passing".to_string()),
            empirical_exit_code: Some(1),
            empirical_failures: vec!["TestAdd/zeros".to_string()],
            ..GateContext::default()
        };
        let err = chain.run(&ctx).unwrap_err();
        assert!(matches!(
            err.kind,
            super::super::IntegrityCheck::EmpiricalHonesty
        ));
    }
}
