//! Empirical Honesty check (`SPEC_FULL.md` §4.6 item 3, property P8).

use super::{CheckResult, Gate, GateContext, GateError, IntegrityCheck};

pub const SUCCESS_KEYWORDS: &[&str] = &["success", "passing", "complete", "done", "works"];

pub struct EmpiricalHonestyGate;

impl Gate for EmpiricalHonestyGate {
    fn kind(&self) -> IntegrityCheck {
        IntegrityCheck::EmpiricalHonesty
    }

    /// A claim containing any success keyword while the empirical exit code
    /// is non-zero or failures exist is dishonest; honest admission of
    /// failure passes.
    fn check(&self, ctx: &GateContext) -> CheckResult {
        let claim = ctx.claim_text.as_deref().unwrap_or("").to_lowercase();
        let empirically_failed =
            ctx.empirical_exit_code.unwrap_or(0) != 0 || !ctx.empirical_failures.is_empty();

        if !empirically_failed {
            return Ok(());
        }

        let claims_success = SUCCESS_KEYWORDS.iter().any(|kw| claim.contains(kw));
        if claims_success {
            Err(GateError {
                kind: self.kind(),
                title: "Claim contradicts empirical test results".to_string(),
                message: format!(
                    "claim asserts success but exit_code={:?}, failures={:?}",
                    ctx.empirical_exit_code, ctx.empirical_failures
                ),
                suggested_actions: vec![
                    "Report the actual failing tests instead of claiming success".to_string(),
                ],
                technical_details: claim,
            })
        } else {
            Ok(())
        }
    }
}
