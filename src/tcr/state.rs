//! TCR State (`SPEC_FULL.md` §3): derivable purely from the gate-history
//! sequence and the task inputs, so a durable-runtime collaborator can
//! reconstruct it by replay.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use super::task::{GateKind, GateResult, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TcrStatus {
    Bootstrapped,
    Running(GateKind),
    FixingGate(GateKind),
    Regenerating,
    Committed,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcrState {
    pub task: Task,
    pub cell: Option<Cell>,
    pub gate_history: Vec<GateResult>,
    pub status: TcrStatus,
    pub fix_attempts_used: HashMap<GateKind, u32>,
    pub regen_attempts_used: u32,
    pub committed: bool,
}

impl TcrState {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            cell: None,
            gate_history: Vec::new(),
            status: TcrStatus::Bootstrapped,
            fix_attempts_used: HashMap::new(),
            regen_attempts_used: 0,
            committed: false,
        }
    }

    pub fn record(&mut self, result: GateResult) {
        self.gate_history.push(result);
    }

    pub fn fix_attempts_for(&self, gate: GateKind) -> u32 {
        *self.fix_attempts_used.get(&gate).unwrap_or(&0)
    }

    pub fn increment_fix_attempts(&mut self, gate: GateKind) {
        *self.fix_attempts_used.entry(gate).or_insert(0) += 1;
    }

    pub fn reset_fix_attempts(&mut self) {
        self.fix_attempts_used.clear();
    }
}
