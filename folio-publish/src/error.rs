//! Error types for folio-publish.

use thiserror::Error;

use folio_core::GitError;

use crate::orchestrator::PublishStep;

/// All errors that can abort a publish.
///
/// None of these are retried: conflicts, rejected pushes and credential
/// failures need a human.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A git step exited non-zero; the remaining steps were not run.
    #[error("{step} failed: {source}")]
    Step {
        step: PublishStep,
        #[source]
        source: GitError,
    },

    #[error("commit message must not be empty")]
    EmptyMessage,
}

impl PublishError {
    /// The step that failed, if any.
    pub fn step(&self) -> Option<PublishStep> {
        match self {
            PublishError::Step { step, .. } => Some(*step),
            PublishError::EmptyMessage => None,
        }
    }
}
