//! Error types for folio-deploy.

use thiserror::Error;

use folio_core::GitError;

/// Everything that can go wrong while locating or reading deployment status.
///
/// Whether an error ends polling is decided by [`crate::classify`], not here.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The remote points at a host other than the configured CI provider.
    #[error("remote URL '{url}' is not hosted on {expected}")]
    ForeignHost { url: String, expected: String },

    #[error("cannot read owner/repo from remote URL '{url}'")]
    MalformedRemote { url: String },

    #[error("could not read git remote: {0}")]
    Git(#[from] GitError),

    /// Connection, TLS or timeout failure before a response arrived.
    #[error("status request failed: {0}")]
    Transport(String),

    #[error("could not decode workflow runs: {0}")]
    Decode(String),

    /// The provider answered with a non-2xx status.
    #[error("CI provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
}
