//! Hard-Work Enforcement check (`SPEC_FULL.md` §4.6 item 4).

use super::{CheckResult, Gate, GateContext, GateError, IntegrityCheck};

const STUB_MARKERS: &[&str] = &[
    "panic(\"not implemented\")",
    "unimplemented!()",
    "todo!()",
    "return nil",
    "return 0",
    "return \"\"",
];

pub struct HardWorkEnforcementGate;

impl Gate for HardWorkEnforcementGate {
    fn kind(&self) -> IntegrityCheck {
        IntegrityCheck::HardWorkEnforcement
    }

    /// Fails if, after VerifyGREEN passed, any implementation snippet is a
    /// bare stub — indicating the tests that passed against it are trivial.
    fn check(&self, ctx: &GateContext) -> CheckResult {
        let stubs: Vec<&String> = ctx
            .implementation_snippets
            .iter()
            .filter(|snippet| is_stub(snippet))
            .collect();

        if stubs.is_empty() {
            Ok(())
        } else {
            Err(GateError {
                kind: self.kind(),
                title: "Implementation contains stub bodies despite passing tests".to_string(),
                message: format!("{} stub-like function bodies found", stubs.len()),
                suggested_actions: vec![
                    "Implement real logic; the passing tests likely do not exercise this path"
                        .to_string(),
                ],
                technical_details: stubs
                    .iter()
                    .map(|s| s.trim())
                    .collect::<Vec<_>>()
                    .join("\n---\n"),
            })
        }
    }
}

fn is_stub(snippet: &str) -> bool {
    let trimmed = snippet.trim();
    STUB_MARKERS.iter().any(|marker| trimmed == *marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_implementation_passes() {
        let gate = HardWorkEnforcementGate;
        let ctx = GateContext {
            implementation_snippets: vec!["return a + b".to_string()],
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_ok());
    }

    #[test]
    fn bare_stub_fails() {
        let gate = HardWorkEnforcementGate;
        let ctx = GateContext {
            implementation_snippets: vec!["panic(\"not implemented\")".to_string()],
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_err());
    }
}
