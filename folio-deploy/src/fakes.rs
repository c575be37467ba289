//! In-memory [`RunsApi`] for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::RunsApi;
use crate::error::DeployError;
use crate::remote::RepoCoordinates;
use crate::runs::WorkflowRun;

#[derive(Debug, Clone)]
enum Reply {
    Runs(Vec<WorkflowRun>),
    Transport(String),
    Decode(String),
    Http(u16),
}

/// Replays scripted replies in order; the last reply is sticky. With nothing
/// scripted every call returns an empty run list (pending).
#[derive(Debug, Default)]
pub struct ScriptedRuns {
    replies: Mutex<Vec<Reply>>,
    requests: Mutex<Vec<(RepoCoordinates, String)>>,
}

impl ScriptedRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self, runs: Vec<WorkflowRun>) -> &Self {
        self.push(Reply::Runs(runs))
    }

    pub fn transport_error(&self, message: &str) -> &Self {
        self.push(Reply::Transport(message.to_string()))
    }

    pub fn decode_error(&self, message: &str) -> &Self {
        self.push(Reply::Decode(message.to_string()))
    }

    pub fn http_error(&self, status: u16) -> &Self {
        self.push(Reply::Http(status))
    }

    fn push(&self, reply: Reply) -> &Self {
        lock(&self.replies).push(reply);
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<(RepoCoordinates, String)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl RunsApi for ScriptedRuns {
    async fn list_runs(
        &self,
        repo: &RepoCoordinates,
        sha: &str,
    ) -> Result<Vec<WorkflowRun>, DeployError> {
        lock(&self.requests).push((repo.clone(), sha.to_string()));

        let reply = {
            let mut replies = lock(&self.replies);
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies
                    .first()
                    .cloned()
                    .unwrap_or(Reply::Runs(Vec::new()))
            }
        };

        match reply {
            Reply::Runs(runs) => Ok(runs),
            Reply::Transport(message) => Err(DeployError::Transport(message)),
            Reply::Decode(message) => Err(DeployError::Decode(message)),
            Reply::Http(status) => Err(DeployError::Api {
                status,
                body: format!("scripted HTTP {status}"),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
