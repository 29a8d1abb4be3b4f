//! Cell Assembly — the saga (C4, `SPEC_FULL.md` §4.4).
//!
//! Composes the Port Registry, Worktree Manager, and Server Supervisor into
//! a single [`Cell`]. If any step fails, every prior step is undone in
//! reverse order and the returned error identifies the failing step.

use std::path::PathBuf;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cell::{Cell, CellState, PortRegistry, ServerCommand, ServerHandle, ServerSupervisor, WorktreeManager};
use crate::error::{CoreError, Result};

/// Which saga step failed, carried by [`CoreError::CellBootError`] so the
/// saga (and any caller inspecting the error) knows how much was undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyStep {
    S1AllocatePort,
    S2CreateWorktree,
    S3BootServer,
}

/// Owns the three leaf managers and the table of live server handles (kept
/// out of [`Cell`] itself since a process handle isn't serializable).
pub struct CellAssembly {
    ports: PortRegistry,
    worktrees: WorktreeManager,
    supervisor: ServerSupervisor,
    live: DashMap<String, (u16, PathBuf, ServerHandle)>,
}

impl CellAssembly {
    pub fn new(
        port_min: u16,
        port_max: u16,
        repo_path: PathBuf,
        worktrees_root: PathBuf,
        boot_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            ports: PortRegistry::new(port_min, port_max),
            worktrees: WorktreeManager::new(repo_path, worktrees_root)?,
            supervisor: ServerSupervisor::new(boot_timeout),
            live: DashMap::new(),
        })
    }

    /// Run the saga: S1 allocate port, S2 create worktree, S3 boot server,
    /// S4 record. Any failure undoes completed steps in reverse order.
    pub async fn assemble(
        &self,
        cell_id: &str,
        branch: &str,
        command: &ServerCommand,
    ) -> Result<Cell> {
        let port = self.ports.allocate().map_err(|e| {
            error!(cell_id, "S1 allocate_port failed");
            wrap_boot_error(AssemblyStep::S1AllocatePort, e)
        })?;

        let worktree_path = match self.worktrees.create(branch).await {
            Ok(path) => path,
            Err(e) => {
                self.ports.release(port);
                error!(cell_id, "S2 create_worktree failed, undid S1");
                return Err(wrap_boot_error(AssemblyStep::S2CreateWorktree, e));
            }
        };

        let handle = match self.supervisor.boot(command, port, &worktree_path).await {
            Ok(h) => h,
            Err(e) => {
                self.worktrees.destroy(&worktree_path).await;
                self.ports.release(port);
                error!(cell_id, "S3 boot_server failed, undid S2 and S1");
                return Err(wrap_boot_error(AssemblyStep::S3BootServer, e));
            }
        };

        // S4: record. Ephemeral; there is no undo for this step.
        self.live
            .insert(cell_id.to_string(), (port, worktree_path.clone(), handle));

        info!(cell_id, port, "cell assembled");
        Ok(Cell {
            cell_id: cell_id.to_string(),
            port,
            worktree_path: worktree_path.clone(),
            branch_name: branch.to_string(),
            server_endpoint: Cell::endpoint_for(port),
            state: CellState::Healthy,
        })
    }

    /// Explicit teardown: S3-undo, S2-undo, S1-undo, in that order, each
    /// tolerating prior partial destruction.
    pub async fn teardown(&self, cell_id: &str) {
        let Some((_, (port, worktree_path, handle))) = self.live.remove(cell_id) else {
            // Nothing recorded for this cell-id: teardown is idempotent.
            return;
        };
        self.supervisor.terminate(handle).await;
        self.worktrees.destroy(&worktree_path).await;
        self.ports.release(port);
        info!(cell_id, "cell torn down");
    }

    pub fn is_healthy(&self, cell_id: &str) -> bool {
        self.live.contains_key(cell_id)
    }
}

fn wrap_boot_error(step: AssemblyStep, source: CoreError) -> CoreError {
    CoreError::CellBootError {
        step,
        message: source.to_string(),
        source: Some(Box::new(source)),
    }
}

/// Free functions mirroring [`CellAssembly::assemble`]/[`CellAssembly::teardown`]
/// for call sites that only need a one-shot saga without holding on to an
/// assembly instance (e.g. the benchmark harness, which owns one assembly
/// per independent run).
pub async fn assemble(
    assembly: &CellAssembly,
    cell_id: &str,
    branch: &str,
    command: &ServerCommand,
) -> Result<Cell> {
    assembly.assemble(cell_id, branch, command).await
}

pub async fn teardown(assembly: &CellAssembly, cell_id: &str) {
    assembly.teardown(cell_id).await
}
