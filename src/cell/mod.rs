//! Cell Lifecycle Manager (`SPEC_FULL.md` §4.1-§4.4).
//!
//! A [`Cell`] is the isolated execution environment for one agent: an
//! allocated port, an isolated worktree, and a running agent-API server
//! process. [`assembly`] composes the three leaf managers into a saga that
//! guarantees cleanup on every exit path.

mod assembly;
mod port_registry;
mod supervisor;
mod worktree;

pub use assembly::{assemble, teardown, AssemblyStep, CellAssembly};
pub use port_registry::PortRegistry;
pub use supervisor::{ServerHandle, ServerSupervisor};
pub use worktree::WorktreeManager;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Cell`] (`SPEC_FULL.md` §3, invariant I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Booting,
    Healthy,
    Executing,
    TearingDown,
    Released,
}

/// A runtime environment for one agent: a port, a worktree, and a running
/// agent-API server. Created by [`assembly::assemble`], mutated only by its
/// owning orchestration, destroyed exactly once via [`assembly::teardown`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub cell_id: String,
    pub port: u16,
    pub worktree_path: PathBuf,
    pub branch_name: String,
    pub server_endpoint: String,
    pub state: CellState,
}

impl Cell {
    pub fn endpoint_for(port: u16) -> String {
        format!("127.0.0.1:{port}")
    }
}
