//! User-facing results of save, publish, and deploy tracking.

use std::fmt;

use serde::Serialize;

use folio_core::CommitHash;
use folio_deploy::{MonitorSnapshot, PollPhase};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Saved,
    NoChangesToSave,
    NothingToPublish,
    PublishFailed { error: String },
    Deploying { commit: CommitHash },
    Published { commit: CommitHash },
    DeployFailed { commit: CommitHash },
    DeployTimedOut { commit: CommitHash },
    DeployUnreachable { commit: CommitHash, error: String },
    DeployCancelled { commit: CommitHash },
}

impl Outcome {
    /// Map a monitor's current state onto the outcome shown to the user.
    pub fn from_snapshot(snapshot: &MonitorSnapshot) -> Self {
        let commit = snapshot.commit.clone();
        if snapshot.cancelled {
            return Outcome::DeployCancelled { commit };
        }
        match snapshot.phase {
            PollPhase::Polling => Outcome::Deploying { commit },
            PollPhase::Success => Outcome::Published { commit },
            PollPhase::Failure => Outcome::DeployFailed { commit },
            PollPhase::TimedOut => Outcome::DeployTimedOut { commit },
            PollPhase::ApiError => Outcome::DeployUnreachable {
                commit,
                error: snapshot
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
        }
    }

    /// `false` only while a deploy is still being tracked.
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Deploying { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::PublishFailed { .. }
                | Outcome::DeployFailed { .. }
                | Outcome::DeployTimedOut { .. }
                | Outcome::DeployUnreachable { .. }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Saved => f.write_str("Saved"),
            Outcome::NoChangesToSave => f.write_str("No changes to save"),
            Outcome::NothingToPublish => f.write_str("Nothing to publish"),
            Outcome::PublishFailed { error } => write!(f, "Publish failed: {error}"),
            Outcome::Deploying { commit } => write!(f, "Deploying ({commit})…"),
            Outcome::Published { commit } => write!(f, "Published ({commit})"),
            Outcome::DeployFailed { commit } => write!(f, "Deploy failed ({commit})"),
            Outcome::DeployTimedOut { commit } => write!(f, "Deploy timed out ({commit})"),
            Outcome::DeployUnreachable { commit, error } => {
                write!(f, "Deploy status unreachable ({commit}): {error}")
            }
            Outcome::DeployCancelled { commit } => {
                write!(f, "Deploy tracking cancelled ({commit})")
            }
        }
    }
}
