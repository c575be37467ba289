//! The `git` subprocess seam.
//!
//! Everything that touches the repository goes through [`GitRunner`], so the
//! publish sequence and remote lookup can be exercised against
//! [`crate::fakes::ScriptedGit`] without a real repository.

use std::path::PathBuf;
use std::process::Command;

use crate::error::GitError;

/// Runs one `git` command and returns its captured stdout.
///
/// Implementations must return `Err` for any non-zero exit.
pub trait GitRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String, GitError>;
}

/// [`GitRunner`] backed by the `git` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemGit {
    repo_dir: PathBuf,
}

impl SystemGit {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }
}

impl GitRunner for SystemGit {
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command = args.join(" ");
        tracing::debug!(command = %command, dir = %self.repo_dir.display(), "running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            // Fail on missing credentials instead of blocking on a prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        // `git commit` reports some failures on stdout only.
        let detail = if stderr.trim().is_empty() {
            stdout.trim_end().to_string()
        } else {
            stderr.trim_end().to_string()
        };
        let code = match output.status.code() {
            Some(code) => format!("status {code}"),
            None => "a signal".to_string(),
        };
        Err(GitError::Failed {
            command,
            code,
            output: detail,
        })
    }
}
