//! Test Immutability check (`SPEC_FULL.md` §4.6 item 2).
//!
//! The core marks test files write-disabled after Gate 1 (GenTest); this
//! check compares the content hashes an Activity recorded at that point
//! against hashes recorded again before VerifyRED/VerifyGREEN run. It never
//! touches the filesystem itself, keeping the gate chain replay-safe.

use super::{CheckResult, Gate, GateContext, GateError, IntegrityCheck};

pub struct TestImmutabilityGate;

impl Gate for TestImmutabilityGate {
    fn kind(&self) -> IntegrityCheck {
        IntegrityCheck::TestImmutability
    }

    fn check(&self, ctx: &GateContext) -> CheckResult {
        let mut modified: Vec<&String> = Vec::new();
        for (path, before_hash) in &ctx.test_file_hashes_before {
            match ctx.test_file_hashes_after.get(path) {
                Some(after_hash) if after_hash != before_hash => modified.push(path),
                None => modified.push(path),
                _ => {}
            }
        }

        if modified.is_empty() {
            Ok(())
        } else {
            Err(GateError {
                kind: self.kind(),
                title: "Test files were modified after being locked".to_string(),
                message: format!("modified or missing: {:?}", modified),
                suggested_actions: vec![
                    "Revert changes to the locked test files and continue implementing"
                        .to_string(),
                ],
                technical_details: format!("{} file(s) changed", modified.len()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn passes_when_hashes_are_unchanged() {
        let gate = TestImmutabilityGate;
        let mut before = HashMap::new();
        before.insert("add_test.go".to_string(), "abc123".to_string());
        let ctx = GateContext {
            test_file_hashes_before: before.clone(),
            test_file_hashes_after: before,
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_ok());
    }

    #[test]
    fn fails_when_a_locked_test_file_changed() {
        let gate = TestImmutabilityGate;
        let mut before = HashMap::new();
        before.insert("add_test.go".to_string(), "abc123".to_string());
        let mut after = HashMap::new();
        after.insert("add_test.go".to_string(), "def456".to_string());
        let ctx = GateContext {
            test_file_hashes_before: before,
            test_file_hashes_after: after,
            ..GateContext::default()
        };
        assert!(gate.check(&ctx).is_err());
    }
}
