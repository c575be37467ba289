//! # folio-deploy
//!
//! Deployment tracking for a pushed commit: resolve the CI repository from
//! the git remote, read workflow runs for the commit, and poll them to a
//! terminal [`PollPhase`] under a timeout.
//!
//! Nothing in this crate writes to the CI provider; every request is a read.

pub mod client;
pub mod error;
pub mod fakes;
pub mod machine;
pub mod monitor;
pub mod remote;
pub mod runs;

pub use client::{fetch_status, GitHubClient, RunsApi};
pub use error::DeployError;
pub use machine::{classify, transition, ErrorClass, PollEvent, PollPhase};
pub use monitor::{DeployMonitor, MonitorConfig, MonitorHandle, MonitorSnapshot};
pub use remote::RepoCoordinates;
pub use runs::{select_run, select_status, DeployStatus, RunStatus, WorkflowRun};
