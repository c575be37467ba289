//! Workflow runs and how a list of them collapses into one [`DeployStatus`].

use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow run as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    /// `waiting`, `requested`, `pending` and anything added later.
    #[serde(other)]
    Other,
}

/// The subset of a workflow run the monitor consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl WorkflowRun {
    pub fn queued() -> Self {
        Self {
            status: RunStatus::Queued,
            conclusion: None,
        }
    }

    pub fn in_progress() -> Self {
        Self {
            status: RunStatus::InProgress,
            conclusion: None,
        }
    }

    pub fn completed(conclusion: &str) -> Self {
        Self {
            status: RunStatus::Completed,
            conclusion: Some(conclusion.to_string()),
        }
    }

    fn is_skipped(&self) -> bool {
        self.conclusion.as_deref() == Some("skipped")
    }
}

/// Response body of `GET /repos/{owner}/{repo}/actions/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunsPage {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Pending,
    Success,
    Failure,
}

/// Pick the run that speaks for the commit.
///
/// The first (newest) run that was not skipped wins. When every run was
/// skipped, e.g. path-filtered workflows, the first run is used so polling
/// still terminates.
pub fn select_run(runs: &[WorkflowRun]) -> Option<&WorkflowRun> {
    runs.iter().find(|run| !run.is_skipped()).or_else(|| runs.first())
}

/// Collapse `runs` (newest first) into a [`DeployStatus`].
pub fn select_status(runs: &[WorkflowRun]) -> DeployStatus {
    match select_run(runs) {
        None => DeployStatus::Pending,
        Some(run) if run.status != RunStatus::Completed => DeployStatus::Pending,
        Some(run) if run.conclusion.as_deref() == Some("success") => DeployStatus::Success,
        Some(_) => DeployStatus::Failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_runs(vec![], DeployStatus::Pending)]
    #[case::queued(vec![WorkflowRun::queued()], DeployStatus::Pending)]
    #[case::in_progress(vec![WorkflowRun::in_progress()], DeployStatus::Pending)]
    #[case::success(vec![WorkflowRun::completed("success")], DeployStatus::Success)]
    #[case::failure(vec![WorkflowRun::completed("failure")], DeployStatus::Failure)]
    #[case::cancelled(vec![WorkflowRun::completed("cancelled")], DeployStatus::Failure)]
    #[case::timed_out(vec![WorkflowRun::completed("timed_out")], DeployStatus::Failure)]
    #[case::skipped_then_success(
        vec![WorkflowRun::completed("skipped"), WorkflowRun::completed("success")],
        DeployStatus::Success
    )]
    #[case::only_skipped(vec![WorkflowRun::completed("skipped")], DeployStatus::Failure)]
    #[case::skipped_then_running(
        vec![WorkflowRun::completed("skipped"), WorkflowRun::in_progress()],
        DeployStatus::Pending
    )]
    #[case::newest_wins(
        vec![WorkflowRun::completed("failure"), WorkflowRun::completed("success")],
        DeployStatus::Failure
    )]
    fn status_from_runs(#[case] runs: Vec<WorkflowRun>, #[case] expected: DeployStatus) {
        assert_eq!(select_status(&runs), expected);
    }

    #[test]
    fn decodes_provider_payload_and_ignores_extra_fields() {
        let body = r#"{
            "total_count": 2,
            "workflow_runs": [
                {"id": 1, "name": "deploy", "status": "waiting", "conclusion": null},
                {"id": 2, "status": "completed", "conclusion": "success", "head_sha": "abc"}
            ]
        }"#;
        let page: RunsPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.workflow_runs[0].status, RunStatus::Other);
        assert_eq!(page.workflow_runs[1], WorkflowRun::completed("success"));
        assert_eq!(select_status(&page.workflow_runs), DeployStatus::Pending);
    }

    #[test]
    fn missing_run_list_decodes_as_empty() {
        let page: RunsPage = serde_json::from_str(r#"{"total_count":0}"#).unwrap();
        assert!(page.workflow_runs.is_empty());
    }
}
