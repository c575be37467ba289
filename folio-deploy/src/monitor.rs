//! Deploy monitor: drives the poll state machine on Tokio timers.
//!
//! One monitor task per published commit. The task polls immediately, then
//! once per interval, until the phase is terminal. State is published through
//! a `watch` channel; the `cancelled` flag lives in the same watched value so
//! a cancel and a tick result can never interleave.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use folio_core::{CommitHash, Settings};

use crate::client::RunsApi;
use crate::machine::{classify, transition, ErrorClass, PollClock, PollEvent, PollPhase};
use crate::remote::RepoCoordinates;
use crate::runs::{select_run, select_status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(folio_core::config::DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(folio_core::config::DEFAULT_DEPLOY_TIMEOUT_SECS),
        }
    }
}

impl MonitorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.poll_interval(),
            timeout: settings.deploy_timeout(),
        }
    }
}

/// Observable state of one monitor run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    pub commit: CommitHash,
    pub repo: RepoCoordinates,
    pub phase: PollPhase,
    /// Status requests issued so far.
    pub polls: u32,
    pub elapsed_ms: u64,
    /// Conclusion of the most recently selected run, if it had one.
    pub conclusion: Option<String>,
    /// Error from the latest tick, if that tick failed.
    pub last_error: Option<String>,
    pub cancelled: bool,
}

impl MonitorSnapshot {
    fn new(repo: RepoCoordinates, commit: CommitHash) -> Self {
        Self {
            commit,
            repo,
            phase: PollPhase::Polling,
            polls: 0,
            elapsed_ms: 0,
            conclusion: None,
            last_error: None,
            cancelled: false,
        }
    }

    /// Polling has stopped, either terminally or by cancellation.
    pub fn is_settled(&self) -> bool {
        self.cancelled || self.phase.is_terminal()
    }
}

/// Factory for monitor tasks sharing one API client and timing config.
#[derive(Clone)]
pub struct DeployMonitor {
    api: Arc<dyn RunsApi>,
    config: MonitorConfig,
}

impl DeployMonitor {
    pub fn new(api: Arc<dyn RunsApi>, config: MonitorConfig) -> Self {
        Self { api, config }
    }

    /// Spawn a monitor task for `commit`. Must be called inside a Tokio runtime.
    pub fn start(&self, repo: RepoCoordinates, commit: CommitHash) -> MonitorHandle {
        let (tx, _rx) = watch::channel(MonitorSnapshot::new(repo.clone(), commit.clone()));
        let state = Arc::new(tx);
        let task = tokio::spawn(poll_loop(
            self.api.clone(),
            self.config,
            repo,
            commit,
            state.clone(),
        ));
        MonitorHandle { state, task }
    }
}

/// Owner of a running monitor. Dropping the handle cancels the monitor.
pub struct MonitorHandle {
    state: Arc<watch::Sender<MonitorSnapshot>>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        !self.state.borrow().is_settled()
    }

    /// Tear the monitor down. The pending timer and any in-flight request are
    /// dropped; the snapshot is frozen as of this call.
    pub fn cancel(&self) {
        let cancelled = self.state.send_if_modified(|snapshot| {
            if snapshot.is_settled() {
                return false;
            }
            snapshot.cancelled = true;
            true
        });
        self.task.abort();
        if cancelled {
            tracing::info!(commit = %self.state.borrow().commit, "deploy monitor cancelled");
        }
    }

    /// Wait until the monitor settles and return the final snapshot.
    pub async fn wait(&self) -> MonitorSnapshot {
        let mut rx = self.state.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if snapshot.is_settled() {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_loop(
    api: Arc<dyn RunsApi>,
    config: MonitorConfig,
    repo: RepoCoordinates,
    commit: CommitHash,
    state: Arc<watch::Sender<MonitorSnapshot>>,
) {
    let mut clock = PollClock::start(Instant::now());
    let mut phase = PollPhase::Polling;
    let mut polls = 0u32;
    tracing::info!(commit = %commit, repo = %repo, "deploy monitor started");

    loop {
        clock.tick(Instant::now());
        let mut conclusion = None;
        let mut last_error = None;

        let event = if clock.expired(config.timeout) {
            PollEvent::Deadline
        } else {
            polls += 1;
            match api.list_runs(&repo, commit.as_str()).await {
                Ok(runs) => {
                    conclusion = select_run(&runs).and_then(|run| run.conclusion.clone());
                    PollEvent::Observed(select_status(&runs))
                }
                Err(err) => {
                    let class = classify(&err);
                    match class {
                        ErrorClass::Retry => {
                            tracing::warn!(commit = %commit, error = %err, "status check failed; retrying")
                        }
                        ErrorClass::Abort => {
                            tracing::error!(commit = %commit, error = %err, "status unreachable")
                        }
                    }
                    last_error = Some(err.to_string());
                    PollEvent::Failed(class)
                }
            }
        };

        phase = transition(phase, event);
        let elapsed_ms = u64::try_from(clock.last_elapsed().as_millis()).unwrap_or(u64::MAX);
        let applied = state.send_if_modified(|snapshot| {
            if snapshot.cancelled {
                return false;
            }
            snapshot.phase = phase;
            snapshot.polls = polls;
            snapshot.elapsed_ms = elapsed_ms;
            if conclusion.is_some() {
                snapshot.conclusion = conclusion;
            }
            snapshot.last_error = last_error;
            true
        });
        if !applied {
            return;
        }

        if phase.is_terminal() {
            tracing::info!(commit = %commit, phase = ?phase, polls, elapsed_ms, "deploy monitor finished");
            return;
        }
        tokio::time::sleep(config.interval).await;
    }
}
