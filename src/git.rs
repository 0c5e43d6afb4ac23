// ABOUTME: Local git operations for pushing code to the server.
// ABOUTME: Supports pushing HEAD and pushing a dirty work tree through temporary commits.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Git commands run in a local repository.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Name of the checked out branch.
    pub async fn current_branch(&self) -> Result<String> {
        let output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(&self.dir)
            .stderr(Stdio::inherit())
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: "git branch --show-current".to_string(),
                status: output.status,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Force-push HEAD to `remote`.
    pub async fn push(&self, remote: &str) -> Result<()> {
        self.run(&["push", "--force", remote, "HEAD"]).await
    }

    /// Push HEAD plus staged and unstaged changes to `remote`.
    ///
    /// Changes are committed as two temporary commits which are undone
    /// afterwards, leaving index and work tree as they were. A failed push
    /// is reported after the restore.
    pub async fn push_dirty(&self, remote: &str) -> Result<()> {
        self.run(&["commit", "-m", "staged", "--allow-empty"])
            .await?;
        if let Err(e) = self.commit_unstaged().await {
            // Unstage whatever `add .` picked up, then drop the staged commit.
            self.run(&["reset"]).await?;
            self.run(&["reset", "HEAD~1", "--soft"]).await?;
            return Err(e);
        }

        let pushed = self.push(remote).await;

        self.run(&["reset", "HEAD~1"]).await?;
        self.run(&["reset", "HEAD~1", "--soft"]).await?;

        pushed
    }

    async fn commit_unstaged(&self) -> Result<()> {
        self.run(&["add", "."]).await?;
        self.run(&["commit", "-m", "unstaged", "--allow-empty"])
            .await
    }

    async fn run(&self, args: &[&str]) -> Result<()> {
        let command = format!("git {}", args.join(" "));
        tracing::info!("{}", command);

        let status = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed { command, status })
        }
    }
}
