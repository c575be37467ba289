//! `folio remote` and `folio deploy-status` — deploy tracking without a session.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;

use folio_core::{CommitHash, Settings, SystemGit};
use folio_deploy::{
    fetch_status, DeployMonitor, DeployStatus, GitHubClient, MonitorConfig, RepoCoordinates,
};
use folio_session::Outcome;

use super::paint_outcome;

/// Arguments for `folio deploy-status`.
#[derive(Args, Debug)]
pub struct DeployStatusArgs {
    /// Commit hash (short or full) whose workflow runs to check.
    pub sha: String,

    /// Poll until the deploy settles, the way a session does after publishing.
    #[arg(long)]
    pub watch: bool,
}

impl DeployStatusArgs {
    pub fn run(self, site: &Path) -> Result<()> {
        let settings = load_settings(site)?;
        let repo = resolve(site, &settings)?;
        let client = GitHubClient::from_settings(&settings).context("failed to build CI client")?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;

        if self.watch {
            folio_session::init_tracing();
            let config = MonitorConfig::from_settings(&settings);
            return runtime.block_on(watch(client, config, repo, CommitHash::from(self.sha)));
        }

        let status = runtime
            .block_on(fetch_status(&client, &repo, &self.sha))
            .with_context(|| format!("status request for {} failed", self.sha))?;
        let label = match status {
            DeployStatus::Pending => "pending".yellow(),
            DeployStatus::Success => "success".green().bold(),
            DeployStatus::Failure => "failure".red().bold(),
        };
        println!("{repo} {} {label}", self.sha);
        Ok(())
    }
}

pub fn remote(site: &Path) -> Result<()> {
    let settings = load_settings(site)?;
    println!("{}", resolve(site, &settings)?);
    Ok(())
}

fn load_settings(site: &Path) -> Result<Settings> {
    Settings::load(site).with_context(|| format!("failed to load settings for {}", site.display()))
}

fn resolve(site: &Path, settings: &Settings) -> Result<RepoCoordinates> {
    RepoCoordinates::resolve(
        &SystemGit::new(site),
        &settings.remote,
        &settings.provider_host,
    )
    .with_context(|| {
        format!(
            "cannot resolve CI repository from remote '{}'",
            settings.remote
        )
    })
}

async fn watch(
    client: GitHubClient,
    config: MonitorConfig,
    repo: RepoCoordinates,
    commit: CommitHash,
) -> Result<()> {
    let monitor = DeployMonitor::new(Arc::new(client), config);
    let handle = monitor.start(repo, commit);
    let mut rx = handle.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen_polls = 0;
    let last = loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.polls != seen_polls {
            seen_polls = snapshot.polls;
            println!(
                "  · poll {} at {:.0}s: {:?}",
                snapshot.polls,
                snapshot.elapsed_ms as f64 / 1000.0,
                snapshot.phase
            );
        }
        if snapshot.is_settled() {
            break snapshot;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break rx.borrow().clone();
                }
            }
            _ = &mut ctrl_c => {
                handle.cancel();
                break handle.snapshot();
            }
        }
    };

    let outcome = Outcome::from_snapshot(&last);
    if outcome.is_failure() {
        anyhow::bail!("{outcome}");
    }
    let message = outcome.to_string();
    println!("{}", paint_outcome(&json!({ "outcome": outcome, "message": message })));
    Ok(())
}
