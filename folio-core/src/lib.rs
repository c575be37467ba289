//! Folio core library — content model, configuration, git plumbing, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and the site content model
//! - [`config`] — [`Settings`] loaded from `folio.yaml` + environment
//! - [`git`] — the [`GitRunner`] seam over the `git` binary
//! - [`tracker`] — [`ChangeTracker`] snapshot/dirty bookkeeping
//! - [`content`] — the [`ContentStore`] contract and its flat-file implementation
//! - [`fakes`] — in-memory doubles shared by the other crates' tests

pub mod config;
pub mod content;
pub mod error;
pub mod fakes;
pub mod git;
pub mod tracker;
pub mod types;

pub use config::Settings;
pub use content::{ContentStore, FlatFileStore};
pub use error::{ConfigError, ContentError, GitError};
pub use git::{GitRunner, SystemGit};
pub use tracker::ChangeTracker;
pub use types::{CommitHash, CommitResult, Document, DocumentName, SiteContent};
