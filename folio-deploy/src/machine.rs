//! Poll state machine.
//!
//! ```text
//!            Observed(Pending) / Failed(Retry)
//!              ┌──────┐
//!              ▼      │
//!          ┌─────────┐ Observed(Success) ┌─────────┐
//!  start ─▶│ Polling │──────────────────▶│ Success │
//!          └─────────┘                   └─────────┘
//!            │  │  └── Observed(Failure) ─▶ Failure
//!            │  └───── Failed(Abort) ─────▶ ApiError
//!            └──────── Deadline ──────────▶ TimedOut
//! ```
//!
//! Terminal phases absorb every further event.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::DeployError;
use crate::runs::DeployStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    Polling,
    Success,
    Failure,
    TimedOut,
    ApiError,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollPhase::Polling)
    }
}

/// What a poll error means for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Try again on the next tick.
    Retry,
    /// Stop polling; the status cannot be known.
    Abort,
}

/// Input to [`transition`], produced once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// The elapsed time passed the ceiling before this tick's fetch.
    Deadline,
    Observed(DeployStatus),
    Failed(ErrorClass),
}

/// Transient vs. fatal boundary for poll errors.
///
/// Transport and decode failures are retried; an HTTP error status means
/// the provider itself refused, so the status is unknowable. Remote and git
/// errors never reach the loop in practice, but would not heal by retrying.
pub fn classify(error: &DeployError) -> ErrorClass {
    match error {
        DeployError::Transport(_) | DeployError::Decode(_) => ErrorClass::Retry,
        DeployError::Api { .. }
        | DeployError::ForeignHost { .. }
        | DeployError::MalformedRemote { .. }
        | DeployError::Git(_) => ErrorClass::Abort,
    }
}

pub fn transition(phase: PollPhase, event: PollEvent) -> PollPhase {
    if phase.is_terminal() {
        return phase;
    }
    match event {
        PollEvent::Deadline => PollPhase::TimedOut,
        PollEvent::Observed(DeployStatus::Success) => PollPhase::Success,
        PollEvent::Observed(DeployStatus::Failure) => PollPhase::Failure,
        PollEvent::Observed(DeployStatus::Pending) => PollPhase::Polling,
        PollEvent::Failed(ErrorClass::Retry) => PollPhase::Polling,
        PollEvent::Failed(ErrorClass::Abort) => PollPhase::ApiError,
    }
}

/// Elapsed-time bookkeeping for one monitor run.
#[derive(Debug, Clone, Copy)]
pub struct PollClock {
    started_at: Instant,
    last_elapsed: Duration,
}

impl PollClock {
    pub fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            last_elapsed: Duration::ZERO,
        }
    }

    /// Recompute elapsed time at `now` and remember it.
    pub fn tick(&mut self, now: Instant) -> Duration {
        self.last_elapsed = now.saturating_duration_since(self.started_at);
        self.last_elapsed
    }

    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    /// `true` once the last recorded elapsed time exceeds `timeout`.
    pub fn expired(&self, timeout: Duration) -> bool {
        self.last_elapsed > timeout
    }
}
