//! Session controller.
//!
//! One [`Session`] owns everything an editing session remembers: the
//! in-memory content, the save snapshot, the unpublished flag, the publish
//! in-flight guard and the deploy monitor of the latest publish. Nothing
//! lives in globals; the server holds the session in an `Arc`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{watch, Mutex};

use folio_core::{
    ChangeTracker, CommitHash, CommitResult, ContentError, ContentStore, Document, DocumentName,
    GitRunner, Settings, SiteContent,
};
use folio_deploy::{
    DeployError, DeployMonitor, MonitorConfig, MonitorHandle, MonitorSnapshot, RepoCoordinates,
    RunsApi,
};
use folio_publish::{PublishError, PublishOrchestrator};

use crate::error::SessionError;
use crate::outcome::Outcome;

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn ContentStore>,
    pub git: Arc<dyn GitRunner>,
    pub runs: Arc<dyn RunsApi>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditReport {
    pub document: DocumentName,
    pub dirty: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub documents: usize,
    pub dirty: bool,
    pub unpublished: bool,
    pub publishing: bool,
    /// Outcome of the latest publish, following its deploy while tracked.
    pub outcome: Option<Outcome>,
    pub message: Option<String>,
    pub deploy: Option<MonitorSnapshot>,
}

struct SessionState {
    content: SiteContent,
    tracker: ChangeTracker,
    unpublished: bool,
    publishing: bool,
    /// Bumped by every save that changed content.
    generation: u64,
    repo: Option<RepoCoordinates>,
    deploy: Option<MonitorHandle>,
    last_publish: Option<Outcome>,
    stopped: bool,
}

impl SessionState {
    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.stopped {
            Err(SessionError::Stopped)
        } else {
            Ok(())
        }
    }

    fn publish_outcome(&self) -> Option<Outcome> {
        match (&self.last_publish, &self.deploy) {
            (Some(Outcome::Deploying { .. }), Some(handle)) => {
                Some(Outcome::from_snapshot(&handle.snapshot()))
            }
            (last, _) => last.clone(),
        }
    }

    /// Clear the unpublished flag unless a save landed while git was running.
    fn clear_unpublished(&mut self, published_generation: u64) {
        if self.generation == published_generation {
            self.unpublished = false;
        } else {
            tracing::info!("content saved during publish; keeping unpublished flag");
        }
    }
}

pub struct Session {
    settings: Settings,
    store: Arc<dyn ContentStore>,
    git: Arc<dyn GitRunner>,
    monitor: DeployMonitor,
    state: Mutex<SessionState>,
}

impl Session {
    /// Load the current content and take the initial snapshot.
    pub async fn start(settings: Settings, deps: SessionDeps) -> Result<Self, SessionError> {
        let store = deps.store.clone();
        let content = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|err| SessionError::Protocol(format!("content load join error: {err}")))??;
        let tracker = ChangeTracker::with_snapshot(&content)?;
        tracing::info!(documents = content.len(), "session started");

        let monitor = DeployMonitor::new(deps.runs, MonitorConfig::from_settings(&settings));
        Ok(Self {
            settings,
            store: deps.store,
            git: deps.git,
            monitor,
            state: Mutex::new(SessionState {
                content,
                tracker,
                unpublished: false,
                publishing: false,
                generation: 0,
                repo: None,
                deploy: None,
                last_publish: None,
                stopped: false,
            }),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cancel deploy tracking and refuse further edits, saves and publishes.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.stopped {
            return;
        }
        state.stopped = true;
        if let Some(handle) = &state.deploy {
            handle.cancel();
        }
        tracing::info!("session stopped");
    }

    /// Replace one document in memory.
    pub async fn edit(&self, name: DocumentName, value: Value) -> Result<EditReport, SessionError> {
        if !name.is_valid() {
            return Err(ContentError::InvalidName(name.0).into());
        }
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.ensure_running()?;

        let document = document_from_edit(state.content.get(&name), value);
        state.content.set(name.clone(), document);
        let dirty = state.tracker.is_dirty(&state.content)?;
        tracing::debug!(document = %name, dirty, "document edited");
        Ok(EditReport {
            document: name,
            dirty,
        })
    }

    /// Persist the current content, then compare it against the snapshot.
    pub async fn save(&self) -> Result<Outcome, SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.ensure_running()?;

        let store = self.store.clone();
        let content = state.content.clone();
        tokio::task::spawn_blocking(move || store.write(&content))
            .await
            .map_err(|err| SessionError::Protocol(format!("content write join error: {err}")))??;

        if !state.tracker.is_dirty(&state.content)? {
            tracing::info!("save: no changes");
            return Ok(Outcome::NoChangesToSave);
        }
        state.tracker.commit(&state.content)?;
        state.unpublished = true;
        state.generation += 1;
        tracing::info!(documents = state.content.len(), "saved");
        Ok(Outcome::Saved)
    }

    /// Commit and push saved content, then start tracking its deploy.
    ///
    /// Rejected while another publish is running or when nothing has been
    /// saved since the last publish. Git failures are reported as
    /// [`Outcome::PublishFailed`], not as errors.
    pub async fn publish(&self, message: Option<&str>) -> Result<Outcome, SessionError> {
        let (job, message, generation) = {
            let mut state = self.state.lock().await;
            state.ensure_running()?;
            if state.publishing {
                return Err(SessionError::PublishInFlight);
            }
            if !state.unpublished {
                return Err(SessionError::NothingUnpublished);
            }
            state.publishing = true;
            // Dropping the handle cancels the earlier monitor.
            state.deploy = None;
            state.last_publish = None;

            let job = PublishJob {
                orchestrator: PublishOrchestrator::new(self.git.clone()),
                git: self.git.clone(),
                remote: self.settings.remote.clone(),
                provider_host: self.settings.provider_host.clone(),
                cached_repo: state.repo.clone(),
            };
            let message = self.settings.commit_message(message).to_string();
            (job, message, state.generation)
        };

        tracing::info!(message = %message, "publish started");
        let joined = tokio::task::spawn_blocking(move || job.run(&message)).await;

        let mut state = self.state.lock().await;
        state.publishing = false;
        let published = joined
            .map_err(|err| SessionError::Protocol(format!("publish task join error: {err}")))?;

        let outcome = match published {
            Err(err) => {
                tracing::error!(error = %err, "publish failed");
                Outcome::PublishFailed {
                    error: err.to_string(),
                }
            }
            Ok(Published::NoChanges) => {
                state.clear_unpublished(generation);
                Outcome::NothingToPublish
            }
            Ok(Published::Committed { commit, repo }) => {
                state.clear_unpublished(generation);
                match repo {
                    Ok(_) if state.stopped => Outcome::DeployCancelled { commit },
                    Ok(repo) => {
                        state.repo = Some(repo.clone());
                        state.deploy = Some(self.monitor.start(repo, commit.clone()));
                        Outcome::Deploying { commit }
                    }
                    Err(err) => {
                        tracing::error!(commit = %commit, error = %err, "cannot track deploy");
                        Outcome::DeployUnreachable {
                            commit,
                            error: err.to_string(),
                        }
                    }
                }
            }
        };

        tracing::info!(outcome = %outcome, "publish finished");
        state.last_publish = Some(outcome.clone());
        Ok(outcome)
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        let state = self.state.lock().await;
        let outcome = state.publish_outcome();
        Ok(SessionStatus {
            documents: state.content.len(),
            dirty: state.tracker.is_dirty(&state.content)?,
            unpublished: state.unpublished,
            publishing: state.publishing,
            message: outcome.as_ref().map(ToString::to_string),
            outcome,
            deploy: state.deploy.as_ref().map(MonitorHandle::snapshot),
        })
    }

    /// Stop tracking the running deploy. `None` when nothing was running.
    pub async fn cancel(&self) -> Option<Outcome> {
        let state = self.state.lock().await;
        let handle = state.deploy.as_ref()?;
        if !handle.is_active() {
            return None;
        }
        handle.cancel();
        state.publish_outcome()
    }

    /// Wait for the tracked deploy to settle and return the publish outcome.
    ///
    /// Returns immediately when no deploy is being tracked.
    pub async fn wait_for_deploy(&self) -> Option<Outcome> {
        let rx = {
            let state = self.state.lock().await;
            match &state.deploy {
                Some(handle) => handle.subscribe(),
                None => return state.publish_outcome(),
            }
        };
        let snapshot = settled(rx).await;
        Some(Outcome::from_snapshot(&snapshot))
    }
}

/// Strings edit Markdown documents and create new ones; anything else is JSON.
fn document_from_edit(existing: Option<&Document>, value: Value) -> Document {
    match (existing, value) {
        (None | Some(Document::Markdown(_)), Value::String(text)) => Document::Markdown(text),
        (_, value) => Document::Json(value),
    }
}

async fn settled(mut rx: watch::Receiver<MonitorSnapshot>) -> MonitorSnapshot {
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

enum Published {
    NoChanges,
    Committed {
        commit: CommitHash,
        repo: Result<RepoCoordinates, DeployError>,
    },
}

/// Blocking half of a publish: the git sequence, then remote resolution.
struct PublishJob {
    orchestrator: PublishOrchestrator,
    git: Arc<dyn GitRunner>,
    remote: String,
    provider_host: String,
    cached_repo: Option<RepoCoordinates>,
}

impl PublishJob {
    fn run(self, message: &str) -> Result<Published, PublishError> {
        match self.orchestrator.publish(message)? {
            CommitResult::NoChanges => Ok(Published::NoChanges),
            CommitResult::Committed(commit) => {
                let repo = match self.cached_repo {
                    Some(repo) => Ok(repo),
                    None => RepoCoordinates::resolve(
                        self.git.as_ref(),
                        &self.remote,
                        &self.provider_host,
                    ),
                };
                Ok(Published::Committed { commit, repo })
            }
        }
    }
}
