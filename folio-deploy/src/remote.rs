//! Repository coordinates from the local git remote.
//!
//! Accepted remote forms:
//!
//! ```text
//! git@github.com:owner/repo.git          (scp-like SSH)
//! ssh://git@github.com/owner/repo.git
//! https://github.com/owner/repo.git      (`.git` and trailing `/` optional)
//! ```

use std::fmt;

use serde::Serialize;

use folio_core::GitRunner;

use crate::error::DeployError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl RepoCoordinates {
    /// Parse `url`, requiring it to live on `expected_host`.
    pub fn parse(url: &str, expected_host: &str) -> Result<Self, DeployError> {
        let trimmed = url.trim();
        let malformed = || DeployError::MalformedRemote {
            url: trimmed.to_string(),
        };

        let (authority, path) = if let Some(rest) = ["https://", "http://", "ssh://"]
            .iter()
            .find_map(|scheme| trimmed.strip_prefix(scheme))
        {
            rest.split_once('/').ok_or_else(malformed)?
        } else {
            // scp-like `user@host:path`; a `/` before the `:` means a local path.
            match trimmed.split_once(':') {
                Some((authority, path)) if !authority.contains('/') => (authority, path),
                _ => return Err(malformed()),
            }
        };

        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if !host.eq_ignore_ascii_case(expected_host) {
            return Err(DeployError::ForeignHost {
                url: trimmed.to_string(),
                expected: expected_host.to_string(),
            });
        }

        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut segments = path.split('/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(malformed()),
        }
    }

    /// Resolve coordinates from `git remote get-url <remote>`.
    pub fn resolve(
        git: &dyn GitRunner,
        remote: &str,
        expected_host: &str,
    ) -> Result<Self, DeployError> {
        let url = git.run(&["remote", "get-url", remote])?;
        let coordinates = Self::parse(&url, expected_host)?;
        tracing::debug!(remote, repo = %coordinates, "resolved repository coordinates");
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::fakes::ScriptedGit;
    use rstest::rstest;

    #[rstest]
    #[case::scp_ssh("git@github.com:acme/site.git")]
    #[case::https("https://github.com/acme/site.git")]
    #[case::https_no_suffix("https://github.com/acme/site")]
    #[case::https_trailing_slash("https://github.com/acme/site/")]
    #[case::https_with_user("https://ci-bot@github.com/acme/site.git")]
    #[case::ssh_scheme("ssh://git@github.com/acme/site.git")]
    #[case::ssh_scheme_port("ssh://git@github.com:22/acme/site.git")]
    #[case::newline("git@github.com:acme/site.git\n")]
    #[case::host_case("https://GitHub.com/acme/site.git")]
    fn parses_supported_forms(#[case] url: &str) {
        let coords = RepoCoordinates::parse(url, "github.com").unwrap();
        assert_eq!(
            coords,
            RepoCoordinates {
                owner: "acme".into(),
                repo: "site".into()
            }
        );
    }

    #[rstest]
    #[case::gitlab_https("https://gitlab.com/acme/site.git")]
    #[case::gitlab_ssh("git@gitlab.com:acme/site.git")]
    #[case::lookalike("https://github.com.evil.io/acme/site.git")]
    fn rejects_foreign_hosts(#[case] url: &str) {
        let err = RepoCoordinates::parse(url, "github.com").unwrap_err();
        assert!(matches!(err, DeployError::ForeignHost { .. }), "got: {err}");
        assert!(err.to_string().contains("github.com"));
    }

    #[rstest]
    #[case::local_path("/srv/git/site.git")]
    #[case::missing_repo("https://github.com/acme")]
    #[case::too_deep("https://github.com/acme/site/extra")]
    #[case::empty("")]
    fn rejects_malformed(#[case] url: &str) {
        let err = RepoCoordinates::parse(url, "github.com").unwrap_err();
        assert!(matches!(err, DeployError::MalformedRemote { .. }), "got: {err}");
    }

    #[test]
    fn resolve_reads_named_remote() {
        let git = ScriptedGit::new();
        git.respond("remote", "git@github.com:acme/site.git\n");
        let coords = RepoCoordinates::resolve(&git, "origin", "github.com").unwrap();
        assert_eq!(coords.to_string(), "acme/site");
        assert_eq!(git.calls(), [["remote", "get-url", "origin"]]);
    }

    #[test]
    fn resolve_propagates_git_failure() {
        let git = ScriptedGit::new();
        git.fail("remote", "error: No such remote 'origin'");
        let err = RepoCoordinates::resolve(&git, "origin", "github.com").unwrap_err();
        assert!(matches!(err, DeployError::Git(_)), "got: {err}");
    }
}
