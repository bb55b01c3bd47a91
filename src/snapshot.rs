//! Snapshot collaborator: version-control integration for the output tree.
//!
//! The engine only needs a narrow interface (initialize, commit, dirtiness,
//! pull/push, stash/unstash), and everything is a no-op when snapshotting is
//! disabled.  The shipped implementation shells out to the `git` binary
//! inside the output directory; its internal behavior is deliberately not
//! part of the engine's contract.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::error::SnapshotError;
use crate::exec::Executor;

/// Version-control operations invoked around and during a backup run.
pub trait Snapshot: std::fmt::Debug {
    /// Whether snapshotting is active.  Callers use this to skip the
    /// dirtiness probe entirely when disabled.
    fn enabled(&self) -> bool;

    /// Ensure the output tree is an initialized repository.
    ///
    /// # Errors
    ///
    /// Returns an error when repository initialization fails.
    fn init(&self) -> Result<()>;

    /// Whether the output tree has uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns an error when the status probe cannot run.
    fn is_dirty(&self) -> Result<bool>;

    /// Stage everything and record a snapshot with `message`.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot subprocess cannot be spawned.
    fn commit(&self, message: &str) -> Result<()>;

    /// Integrate remote snapshots, rebasing local ones on top.
    ///
    /// # Errors
    ///
    /// Returns an error when the subprocess cannot be spawned.
    fn pull(&self) -> Result<()>;

    /// Publish local snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error when the subprocess cannot be spawned.
    fn push(&self) -> Result<()>;

    /// Shelve uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns an error when the subprocess cannot be spawned.
    fn stash(&self) -> Result<()>;

    /// Restore previously shelved changes.
    ///
    /// # Errors
    ///
    /// Returns an error when the subprocess cannot be spawned.
    fn unstash(&self) -> Result<()>;
}

/// Disabled snapshotting: every operation is a successful no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSnapshot;

impl Snapshot for NoSnapshot {
    fn enabled(&self) -> bool {
        false
    }
    fn init(&self) -> Result<()> {
        Ok(())
    }
    fn is_dirty(&self) -> Result<bool> {
        Ok(false)
    }
    fn commit(&self, _: &str) -> Result<()> {
        Ok(())
    }
    fn pull(&self) -> Result<()> {
        Ok(())
    }
    fn push(&self) -> Result<()> {
        Ok(())
    }
    fn stash(&self) -> Result<()> {
        Ok(())
    }
    fn unstash(&self) -> Result<()> {
        Ok(())
    }
}

/// Snapshotting through the `git` binary, operating on the output tree.
///
/// Commits that find nothing to record exit non-zero; those (and push/pull
/// failures against a repository with no remote) are tolerated rather than
/// escalated, matching the advisory nature of snapshotting.
#[derive(Debug)]
pub struct GitSnapshot<E: Executor> {
    executor: E,
    dir: PathBuf,
}

impl<E: Executor> GitSnapshot<E> {
    /// Create a git-backed snapshot collaborator for `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::GitMissing`] when no `git` binary is on
    /// PATH.
    pub fn new(executor: E, dir: &Path) -> Result<Self, SnapshotError> {
        if !executor.which("git") {
            return Err(SnapshotError::GitMissing);
        }
        Ok(Self {
            executor,
            dir: dir.to_path_buf(),
        })
    }

    fn git_tolerant(&self, args: &[&str]) -> Result<()> {
        let result = self.executor.run_in_unchecked(&self.dir, "git", args)?;
        if !result.success {
            tracing::debug!(
                "git {} exited {}: {}",
                args.join(" "),
                result.code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(())
    }
}

impl<E: Executor> Snapshot for GitSnapshot<E> {
    fn enabled(&self) -> bool {
        true
    }

    fn init(&self) -> Result<()> {
        if self.dir.join(".git").exists() {
            return Ok(());
        }
        tracing::info!("initializing snapshot repository in {}", self.dir.display());
        self.executor
            .run_in(&self.dir, "git", &["init", "--initial-branch", "master"])?;
        Ok(())
    }

    fn is_dirty(&self) -> Result<bool> {
        let result = self.executor.run_in(&self.dir, "git", &["status", "-s"])?;
        Ok(!result.stdout.trim().is_empty())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.executor.run_in(&self.dir, "git", &["add", "-A"])?;
        self.git_tolerant(&["commit", "-m", message])
    }

    fn pull(&self) -> Result<()> {
        self.git_tolerant(&["pull", "--rebase"])
    }

    fn push(&self) -> Result<()> {
        self.git_tolerant(&["push"])
    }

    fn stash(&self) -> Result<()> {
        self.git_tolerant(&["stash", "push"])
    }

    fn unstash(&self) -> Result<()> {
        self.git_tolerant(&["stash", "pop"])
    }
}
