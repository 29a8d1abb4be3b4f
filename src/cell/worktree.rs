//! Worktree Manager (C2, `SPEC_FULL.md` §4.2).
//!
//! Thin wrapper over [`crate::git::ShellWorktreeManager`]: every worktree
//! lives at a path keyed by a fresh UUID under a configured worktrees root,
//! so no two live worktrees ever collide, and `destroy` tolerates a path
//! whose storage was already partially reclaimed.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{CoreError, Result};
use crate::git::ShellWorktreeManager;

#[derive(Debug)]
pub struct WorktreeManager {
    inner: ShellWorktreeManager,
    worktrees_root: PathBuf,
}

impl WorktreeManager {
    pub fn new(repo_path: PathBuf, worktrees_root: PathBuf) -> Result<Self> {
        let inner = ShellWorktreeManager::new(repo_path).map_err(|e| CoreError::Git {
            message: e.to_string(),
            source: None,
        })?;
        Ok(Self {
            inner,
            worktrees_root,
        })
    }

    /// Create a fresh, isolated checkout rooted at `branch`.
    pub async fn create(&self, branch: &str) -> Result<PathBuf> {
        let path = self.worktrees_root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&self.worktrees_root)
            .await
            .map_err(CoreError::Io)?;
        self.inner
            .create_worktree(&path, branch)
            .await
            .map_err(|e| CoreError::Git {
                message: e.to_string(),
                source: None,
            })?;
        Ok(path)
    }

    /// Destroy a worktree. Safe to call on a path whose storage was already
    /// partially reclaimed (e.g. by a crashed process or a previous partial
    /// saga undo); any error from `git worktree remove` is logged and
    /// swallowed, then a best-effort filesystem cleanup follows.
    pub async fn destroy(&self, path: &Path) {
        if let Err(e) = self.inner.remove_worktree_full(path, true).await {
            warn!(path = %path.display(), error = %e, "git worktree remove failed, falling back to filesystem cleanup");
        }
        let _ = tokio::fs::remove_dir_all(path).await;
    }
}
