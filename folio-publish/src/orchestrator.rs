//! Publish orchestration.
//!
//! ## `publish` — 6-step protocol
//!
//! 1. `git pull --rebase` — land on top of upstream before staging.
//! 2. `git add -A` — stage everything, including regenerated artifacts.
//! 3. `git status --porcelain` — empty → return `no-changes`, stop.
//! 4. `git commit -m <message>`
//! 5. `git push`
//! 6. `git rev-parse --short HEAD` — the returned hash.
//!
//! Steps run strictly in this order; the first non-zero exit aborts the rest.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use folio_core::{CommitHash, CommitResult, GitError, GitRunner};

use crate::error::PublishError;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    Pull,
    Add,
    Status,
    Commit,
    Push,
    RevParse,
}

impl PublishStep {
    /// Every step, in execution order.
    pub const ALL: [PublishStep; 6] = [
        PublishStep::Pull,
        PublishStep::Add,
        PublishStep::Status,
        PublishStep::Commit,
        PublishStep::Push,
        PublishStep::RevParse,
    ];

    fn args<'a>(&self, message: &'a str) -> Vec<&'a str> {
        match self {
            PublishStep::Pull => vec!["pull", "--rebase"],
            PublishStep::Add => vec!["add", "-A"],
            PublishStep::Status => vec!["status", "--porcelain"],
            PublishStep::Commit => vec!["commit", "-m", message],
            PublishStep::Push => vec!["push"],
            PublishStep::RevParse => vec!["rev-parse", "--short", "HEAD"],
        }
    }
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PublishStep::Pull => "git pull --rebase",
            PublishStep::Add => "git add -A",
            PublishStep::Status => "git status --porcelain",
            PublishStep::Commit => "git commit",
            PublishStep::Push => "git push",
            PublishStep::RevParse => "git rev-parse --short HEAD",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Sequences the git calls that turn saved content into a pushed commit.
///
/// Synchronous, like the git seam; async callers run it on a blocking worker.
#[derive(Clone)]
pub struct PublishOrchestrator {
    git: Arc<dyn GitRunner>,
}

impl PublishOrchestrator {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self { git }
    }

    /// Run the publish sequence with `message` as the commit message.
    ///
    /// Repeated calls without new edits are no-ops past the status check.
    pub fn publish(&self, message: &str) -> Result<CommitResult, PublishError> {
        if message.trim().is_empty() {
            return Err(PublishError::EmptyMessage);
        }

        self.step(PublishStep::Pull, message)?;
        self.step(PublishStep::Add, message)?;

        let porcelain = self.step(PublishStep::Status, message)?;
        if porcelain.trim().is_empty() {
            tracing::info!("working tree clean after staging; nothing to publish");
            return Ok(CommitResult::NoChanges);
        }
        tracing::info!(
            changed = porcelain.lines().filter(|l| !l.trim().is_empty()).count(),
            "staged changes detected"
        );

        self.step(PublishStep::Commit, message)?;
        self.step(PublishStep::Push, message)?;

        let hash = self.step(PublishStep::RevParse, message)?;
        let hash = hash.trim();
        if hash.is_empty() {
            return Err(PublishError::Step {
                step: PublishStep::RevParse,
                source: GitError::EmptyOutput {
                    command: "rev-parse --short HEAD".to_string(),
                },
            });
        }

        tracing::info!(commit = %hash, "published");
        Ok(CommitResult::Committed(CommitHash::from(hash)))
    }

    fn step(&self, step: PublishStep, message: &str) -> Result<String, PublishError> {
        tracing::info!(step = %step, "publish step");
        self.git.run(&step.args(message)).map_err(|source| {
            tracing::error!(step = %step, error = %source, "publish step failed");
            PublishError::Step { step, source }
        })
    }
}
