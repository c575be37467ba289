//! CI provider client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};

use folio_core::Settings;

use crate::error::DeployError;
use crate::remote::RepoCoordinates;
use crate::runs::{select_status, DeployStatus, RunsPage, WorkflowRun};

/// Number of runs requested per status check.
pub const RUNS_PER_PAGE: u32 = 5;

/// Upper bound for one status request, so a hung connection cannot outlive
/// the poll deadline by much.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const BODY_EXCERPT: usize = 200;

/// Read access to workflow runs for a commit, newest first.
#[async_trait]
pub trait RunsApi: Send + Sync {
    async fn list_runs(
        &self,
        repo: &RepoCoordinates,
        sha: &str,
    ) -> Result<Vec<WorkflowRun>, DeployError>;
}

/// One status check for `sha`.
pub async fn fetch_status(
    api: &dyn RunsApi,
    repo: &RepoCoordinates,
    sha: &str,
) -> Result<DeployStatus, DeployError> {
    let runs = api.list_runs(repo, sha).await?;
    Ok(select_status(&runs))
}

/// GitHub Actions REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self, DeployError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeployError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, DeployError> {
        Self::new(settings.api_base.clone(), settings.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Build (without sending) the run-list request for `sha`.
    pub fn runs_request(
        &self,
        repo: &RepoCoordinates,
        sha: &str,
    ) -> Result<reqwest::Request, DeployError> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs",
            self.api_base, repo.owner, repo.repo
        );
        let per_page = RUNS_PER_PAGE.to_string();
        let mut builder = self
            .http
            .get(url)
            .query(&[("head_sha", sha), ("per_page", per_page.as_str())])
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header(USER_AGENT, concat!("folio/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
            .build()
            .map_err(|e| DeployError::Transport(e.to_string()))
    }
}

#[async_trait]
impl RunsApi for GitHubClient {
    async fn list_runs(
        &self,
        repo: &RepoCoordinates,
        sha: &str,
    ) -> Result<Vec<WorkflowRun>, DeployError> {
        let request = self.runs_request(repo, sha)?;
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| DeployError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DeployError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(DeployError::Api {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let page: RunsPage =
            serde_json::from_str(&body).map_err(|e| DeployError::Decode(e.to_string()))?;
        tracing::debug!(
            repo = %repo,
            sha,
            runs = page.workflow_runs.len(),
            "fetched workflow runs"
        );
        Ok(page.workflow_runs)
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
