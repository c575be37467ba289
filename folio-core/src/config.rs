//! Site configuration.
//!
//! # Sources, lowest to highest precedence
//!
//! 1. Built-in defaults ([`Settings::default`]).
//! 2. `<site>/folio.yaml` — optional; every key may be omitted.
//! 3. Environment: `FOLIO_API_BASE`, `FOLIO_GITHUB_TOKEN`, then `GITHUB_TOKEN`.
//!
//! The CI token is never read from the YAML file so it cannot be committed
//! alongside the site content by a publish.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "folio.yaml";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update site content";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 6;
pub const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Git remote whose URL identifies the CI repository.
    pub remote: String,
    /// Host the remote must live on, e.g. `github.com`.
    pub provider_host: String,
    /// Base URL of the CI provider's REST API.
    pub api_base: String,
    #[serde(skip)]
    pub token: Option<String>,
    pub poll_interval_secs: u64,
    pub deploy_timeout_secs: u64,
    pub default_commit_message: String,
    /// Content directory, relative to the site root.
    pub content_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            provider_host: "github.com".to_string(),
            api_base: "https://api.github.com".to_string(),
            token: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            deploy_timeout_secs: DEFAULT_DEPLOY_TIMEOUT_SECS,
            default_commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            content_dir: PathBuf::from("content"),
        }
    }
}

// Hand-written so the token never lands in logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("remote", &self.remote)
            .field("provider_host", &self.provider_host)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("deploy_timeout_secs", &self.deploy_timeout_secs)
            .field("default_commit_message", &self.default_commit_message)
            .field("content_dir", &self.content_dir)
            .finish()
    }
}

impl Settings {
    /// Load settings for the site rooted at `site`, reading the process environment.
    pub fn load(site: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(site, |key| std::env::var(key).ok())
    }

    /// Load settings with an explicit environment lookup; used by tests.
    pub fn load_with_env(
        site: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = config_path(site);
        let mut settings = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            if text.trim().is_empty() {
                Settings::default()
            } else {
                serde_yaml::from_str(&text)
                    .map_err(|source| ConfigError::Parse { path, source })?
            }
        } else {
            Settings::default()
        };

        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(api_base) = non_empty("FOLIO_API_BASE") {
            settings.api_base = api_base;
        }
        settings.token = non_empty("FOLIO_GITHUB_TOKEN").or_else(|| non_empty("GITHUB_TOKEN"));

        settings.validate()?;
        tracing::debug!(settings = ?settings, "loaded site settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.deploy_timeout_secs < self.poll_interval_secs {
            return Err(ConfigError::Invalid {
                field: "deploy_timeout_secs",
                reason: format!(
                    "must not be shorter than poll_interval_secs ({})",
                    self.poll_interval_secs
                ),
            });
        }
        if self.provider_host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "provider_host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.default_commit_message.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_commit_message",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }

    /// Absolute content directory for `site`.
    pub fn content_root(&self, site: &Path) -> PathBuf {
        site.join(&self.content_dir)
    }

    /// `message` when it has text, the configured default otherwise.
    pub fn commit_message<'a>(&'a self, message: Option<&'a str>) -> &'a str {
        match message {
            Some(m) if !m.trim().is_empty() => m,
            _ => &self.default_commit_message,
        }
    }
}

/// Location of the optional settings file, `<site>/folio.yaml`.
pub fn config_path(site: &Path) -> PathBuf {
    site.join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_file_missing() {
        let site = TempDir::new().unwrap();
        let settings = Settings::load_with_env(site.path(), env_from(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval(), Duration::from_secs(6));
        assert_eq!(settings.deploy_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let site = TempDir::new().unwrap();
        std::fs::write(
            config_path(site.path()),
            "poll_interval_secs: 2\ncontent_dir: data\n",
        )
        .unwrap();
        let settings = Settings::load_with_env(site.path(), env_from(&[])).unwrap();
        assert_eq!(settings.poll_interval_secs, 2);
        assert_eq!(settings.content_dir, PathBuf::from("data"));
        assert_eq!(settings.remote, "origin");
    }

    #[test]
    fn token_prefers_folio_variable_and_ignores_blank() {
        let site = TempDir::new().unwrap();
        let settings = Settings::load_with_env(
            site.path(),
            env_from(&[("FOLIO_GITHUB_TOKEN", "  "), ("GITHUB_TOKEN", "gh-token")]),
        )
        .unwrap();
        assert_eq!(settings.token.as_deref(), Some("gh-token"));

        let settings = Settings::load_with_env(
            site.path(),
            env_from(&[("FOLIO_GITHUB_TOKEN", "folio"), ("GITHUB_TOKEN", "gh")]),
        )
        .unwrap();
        assert_eq!(settings.token.as_deref(), Some("folio"));
    }

    #[test]
    fn token_in_yaml_is_rejected() {
        let site = TempDir::new().unwrap();
        std::fs::write(config_path(site.path()), "token: secret\n").unwrap();
        let err = Settings::load_with_env(site.path(), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn zero_interval_is_invalid() {
        let site = TempDir::new().unwrap();
        std::fs::write(config_path(site.path()), "poll_interval_secs: 0\n").unwrap();
        let err = Settings::load_with_env(site.path(), env_from(&[])).unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn debug_redacts_token() {
        let settings = Settings {
            token: Some("ghp_secret".to_string()),
            ..Settings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn blank_message_falls_back_to_default() {
        let settings = Settings::default();
        assert_eq!(settings.commit_message(None), DEFAULT_COMMIT_MESSAGE);
        assert_eq!(settings.commit_message(Some("   ")), DEFAULT_COMMIT_MESSAGE);
        assert_eq!(settings.commit_message(Some("Add post")), "Add post");
    }
}
