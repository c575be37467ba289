//! # folio-publish
//!
//! Strictly ordered git publish sequence.
//!
//! Call [`PublishOrchestrator::publish`] after the content store has written
//! the edits; it returns the pushed commit's short hash or
//! [`CommitResult::NoChanges`](folio_core::CommitResult::NoChanges).

pub mod error;
pub mod orchestrator;

pub use error::PublishError;
pub use orchestrator::{PublishOrchestrator, PublishStep};
