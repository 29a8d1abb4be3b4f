//! Requirements Verification check (`SPEC_FULL.md` §4.6 item 1).

use super::{CheckResult, Gate, GateContext, GateError, IntegrityCheck};

pub struct RequirementsVerificationGate;

impl Gate for RequirementsVerificationGate {
    fn kind(&self) -> IntegrityCheck {
        IntegrityCheck::RequirementsVerification
    }

    /// Fails if the agent's restatement omits any verbatim phrase from the
    /// acceptance criteria.
    fn check(&self, ctx: &GateContext) -> CheckResult {
        let restatement = ctx.requirements_restatement.as_deref().unwrap_or("");
        let missing: Vec<&str> = phrases(&ctx.acceptance_criteria)
            .into_iter()
            .filter(|phrase| !restatement.contains(phrase))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GateError {
                kind: self.kind(),
                title: "Requirements restatement is incomplete".to_string(),
                message: format!("restatement omits: {}", missing.join("; ")),
                suggested_actions: vec![
                    "Re-read the acceptance criteria and restate every scenario verbatim"
                        .to_string(),
                ],
                technical_details: format!("{} phrase(s) missing", missing.len()),
            })
        }
    }
}

fn phrases(acceptance_criteria: &str) -> Vec<&str> {
    acceptance_criteria
        .split([';', '.'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_when_restatement_covers_every_phrase() {
        let gate = RequirementsVerificationGate;
        let ctx = GateContext {
            acceptance_criteria: "Add function Add(a,b int) int returning a+b; table-driven test for {(2,3)->5, (-1,-2)->-3, (0,0)->0}".to_string(),
            requirements_restatement: Some("Add function Add(a,b int) int returning a+b. table-driven test for {(2,3)->5, (-1,-2)->-3, (0,0)->0}".to_string()),
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_ok());
    }

    #[test]
    fn fails_when_a_scenario_is_omitted() {
        let gate = RequirementsVerificationGate;
        let ctx = GateContext {
            acceptance_criteria: "Handles zero; handles negative numbers".to_string(),
            requirements_restatement: Some("Handles zero".to_string()),
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_err());
    }
}
