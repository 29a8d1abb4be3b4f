//! Server Supervisor (C3, `SPEC_FULL.md` §4.3).
//!
//! Spawns the agent-API server (an out-of-scope collaborator process) in a
//! new process group, polls its health endpoint on a fixed cadence, and
//! terminates the whole group on teardown or boot failure.

use std::path::Path;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How to launch the agent-API server; supplied by the caller since the
/// server binary itself is an out-of-scope collaborator.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// A handle to a booted, healthy server. Opaque to orchestration code beyond
/// the fields needed for teardown.
#[derive(Debug)]
pub struct ServerHandle {
    child: Option<Child>,
    pub port: u16,
    pub pid: Option<u32>,
}

pub struct ServerSupervisor {
    boot_timeout: Duration,
}

impl ServerSupervisor {
    pub fn new(boot_timeout: Duration) -> Self {
        Self { boot_timeout }
    }

    /// Boot the server. Invariant I5: on every exit path, either the handle
    /// is returned AND the server is healthy, or no child process remains.
    pub async fn boot(
        &self,
        command: &ServerCommand,
        port: u16,
        worktree_path: &Path,
    ) -> Result<ServerHandle> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(worktree_path)
            .env("PORT", port.to_string())
            .kill_on_drop(true);
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(CoreError::Io)?;
        let pid = child.id();

        let deadline = Instant::now() + self.boot_timeout;
        loop {
            if Self::probe(port).await {
                info!(port, "server healthy");
                return Ok(ServerHandle {
                    child: Some(child),
                    port,
                    pid,
                });
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(CoreError::other(format!(
                    "server exited before becoming healthy: {status}"
                )));
            }
            if Instant::now() >= deadline {
                Self::kill(&mut child, pid).await;
                return Err(CoreError::other(format!(
                    "health probe budget of {:?} elapsed without a healthy response",
                    self.boot_timeout
                )));
            }
            sleep(HEALTH_POLL_INTERVAL).await;
        }
    }

    pub async fn is_healthy(&self, handle: &ServerHandle) -> bool {
        Self::probe(handle.port).await
    }

    /// Kill the server's entire process group. Idempotent: calling this on
    /// an already-terminated handle is a no-op.
    pub async fn terminate(&self, mut handle: ServerHandle) {
        if let Some(child) = handle.child.take() {
            let pid = handle.pid;
            let mut child = child;
            Self::kill(&mut child, pid).await;
        }
    }

    async fn probe(port: u16) -> bool {
        let url = format!("http://127.0.0.1:{port}/health");
        match reqwest::Client::new()
            .get(&url)
            .timeout(Duration::from_millis(150))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn kill(child: &mut Child, pid: Option<u32>) {
        #[cfg(unix)]
        if let Some(pid) = pid {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            let pgid = Pid::from_raw(pid as i32);
            let _ = killpg(pgid, Signal::SIGTERM);
        }
        let _ = child.kill().await;
        let _ = child.wait().await;
        #[cfg(unix)]
        if let Some(pid) = pid {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
        warn!(?pid, "server process group terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn boot_fails_fast_when_server_exits_immediately() {
        let supervisor = ServerSupervisor::new(Duration::from_millis(500));
        let command = ServerCommand {
            program: "false".to_string(),
            args: vec![],
        };
        let result = supervisor.boot(&command, 18080, Path::new("/tmp")).await;
        assert!(result.is_err());
    }
}
