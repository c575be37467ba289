//! Error types for folio-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading [`crate::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed `folio.yaml`; serde_yaml's message carries the line.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A failed `git` invocation. The message carries git's own output verbatim.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with {code}: {output}")]
    Failed {
        command: String,
        code: String,
        output: String,
    },

    #[error("`git {command}` produced no output")]
    EmptyOutput { command: String },
}

impl GitError {
    /// The git sub-command line (without the leading `git`) that failed.
    pub fn command(&self) -> &str {
        match self {
            GitError::Spawn { command, .. }
            | GitError::Failed { command, .. }
            | GitError::EmptyOutput { command } => command,
        }
    }
}

/// Errors from the flat-file content store.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document name '{0}'")]
    InvalidName(String),

    #[error("document '{name}' exists as both .json and .md in {root}")]
    Conflicting { name: String, root: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ContentError {
    ContentError::Io {
        path: path.into(),
        source,
    }
}
