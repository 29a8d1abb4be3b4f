//! Requirement-Drift Detection check (`SPEC_FULL.md` §4.6 item 5).

use super::{CheckResult, Gate, GateContext, GateError, IntegrityCheck};

/// Recompute the alignment check every N units of generated output.
pub const DEFAULT_DRIFT_CHECK_INTERVAL: u64 = 500;
const MIN_ALIGNMENT_SCORE: f32 = 0.70;

pub struct RequirementDriftGate {
    pub check_interval: u64,
}

impl Default for RequirementDriftGate {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_DRIFT_CHECK_INTERVAL,
        }
    }
}

impl Gate for RequirementDriftGate {
    fn kind(&self) -> IntegrityCheck {
        IntegrityCheck::RequirementDriftDetection
    }

    /// Only evaluated when `generated_output_units` has crossed another
    /// multiple of `check_interval`; otherwise this check is a no-op pass.
    fn check(&self, ctx: &GateContext) -> CheckResult {
        if ctx.generated_output_units == 0
            || ctx.generated_output_units % self.check_interval != 0
        {
            return Ok(());
        }

        let score = ctx.drift_alignment_score.unwrap_or(1.0);
        if score < MIN_ALIGNMENT_SCORE {
            Err(GateError {
                kind: self.kind(),
                title: "Generated code has drifted from the acceptance criteria".to_string(),
                message: format!(
                    "alignment score {:.2} fell below the {:.2} threshold",
                    score, MIN_ALIGNMENT_SCORE
                ),
                suggested_actions: vec![
                    "Re-read the acceptance criteria and realign the implementation".to_string(),
                ],
                technical_details: format!("generated_output_units={}", ctx.generated_output_units),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_check_between_intervals() {
        let gate = RequirementDriftGate::default();
        let ctx = GateContext {
            generated_output_units: 250,
            drift_alignment_score: Some(0.1),
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_ok());
    }

    #[test]
    fn fails_at_interval_when_alignment_is_low() {
        let gate = RequirementDriftGate::default();
        let ctx = GateContext {
            generated_output_units: 500,
            drift_alignment_score: Some(0.5),
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_err());
    }

    #[test]
    fn passes_at_interval_when_alignment_is_high() {
        let gate = RequirementDriftGate::default();
        let ctx = GateContext {
            generated_output_units: 1000,
            drift_alignment_score: Some(0.9),
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_ok());
    }
}
