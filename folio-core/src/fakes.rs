//! In-memory doubles for [`GitRunner`] and [`ContentStore`].
//!
//! Compiled unconditionally so downstream crates can use them from their own
//! test suites.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::content::ContentStore;
use crate::error::{ContentError, GitError};
use crate::git::GitRunner;
use crate::types::SiteContent;

type Scripted = Result<String, String>;

/// A [`GitRunner`] that records every call and replays scripted output.
///
/// Responses are keyed by sub-command (`"status"`, `"push"`, …). Each call
/// pops the next queued response; the last one is sticky. Unscripted
/// sub-commands succeed with empty stdout.
#[derive(Debug, Default)]
pub struct ScriptedGit {
    calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<HashMap<String, Vec<Scripted>>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for `subcommand`.
    pub fn respond(&self, subcommand: &str, stdout: &str) -> &Self {
        self.push(subcommand, Ok(stdout.to_string()))
    }

    /// Queue a non-zero exit for `subcommand` with `output` as git's message.
    pub fn fail(&self, subcommand: &str, output: &str) -> &Self {
        self.push(subcommand, Err(output.to_string()))
    }

    fn push(&self, subcommand: &str, response: Scripted) -> &Self {
        lock(&self.responses)
            .entry(subcommand.to_string())
            .or_default()
            .push(response);
        self
    }

    /// Every call so far, each as its full argument list.
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    /// The first argument of every call, in order.
    pub fn subcommands(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|args| args.first().cloned())
            .collect()
    }
}

impl GitRunner for ScriptedGit {
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        lock(&self.calls).push(args.iter().map(|a| a.to_string()).collect());

        let subcommand = args.first().copied().unwrap_or_default();
        let response = {
            let mut responses = lock(&self.responses);
            match responses.get_mut(subcommand) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue.first().cloned().unwrap_or(Ok(String::new())),
                None => Ok(String::new()),
            }
        };

        response.map_err(|output| GitError::Failed {
            command: args.join(" "),
            code: "status 1".to_string(),
            output,
        })
    }
}

/// A [`ContentStore`] holding content in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    content: Mutex<SiteContent>,
    writes: Mutex<usize>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new(initial: SiteContent) -> Self {
        Self {
            content: Mutex::new(initial),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        *lock(&self.writes)
    }

    pub fn stored(&self) -> SiteContent {
        lock(&self.content).clone()
    }

    /// Make subsequent writes fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        *lock(&self.fail_writes) = fail;
    }
}

impl ContentStore for MemoryStore {
    fn load(&self) -> Result<SiteContent, ContentError> {
        Ok(self.stored())
    }

    fn write(&self, content: &SiteContent) -> Result<(), ContentError> {
        if *lock(&self.fail_writes) {
            return Err(ContentError::Io {
                path: "memory".into(),
                source: std::io::Error::other("write refused"),
            });
        }
        *lock(&self.content) = content.clone();
        *lock(&self.writes) += 1;
        Ok(())
    }
}

// A poisoned lock only means another test thread panicked; keep the data.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
