use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the session controller, protocol, and server.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] folio_core::ConfigError),

    #[error("content error: {0}")]
    Content(#[from] folio_core::ContentError),

    #[error("deploy error: {0}")]
    Deploy(#[from] folio_deploy::DeployError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("a publish is already in flight")]
    PublishInFlight,

    #[error("no unpublished changes; save first")]
    NothingUnpublished,

    #[error("session has been stopped")]
    Stopped,

    #[error("session protocol error: {0}")]
    Protocol(String),

    #[error("session is not running (socket missing: {socket})")]
    SessionNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.into(),
        source,
    }
}
