//! Default-branch resolution for a target's repository URL.
//!
//! Accepted URL shapes:
//!
//! ```text
//! https://github.com/acme/widgets(.git)(/)
//! https://ghe.example.com/acme/widgets/tree/main
//! ssh://git@github.com/acme/widgets.git
//! git@github.com:acme/widgets.git
//! github.com/acme/widgets
//! ```
//!
//! Every call is resolved independently; nothing is cached across targets.

use std::fmt;

use tagger_core::{BranchName, RepositoryMetadata};

use crate::error::BranchError;

/// `owner/repo` pair extracted from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Extract `owner/repo` from a repository URL, or `None` if it has no such path.
pub fn parse_repository_url(url: &str) -> Option<RepoSlug> {
    let url = url.trim();
    let path = if let Some((_scheme, rest)) = url.split_once("://") {
        // Drop `user@` and the host.
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (_host, path) = rest.split_once('/')?;
        path
    } else if let Some((host, path)) = url.split_once(':') {
        // scp-style `git@host:owner/repo`; a `/` before the colon means it is not.
        if host.is_empty() || host.contains('/') {
            return None;
        }
        path
    } else {
        let (host, path) = url.split_once('/')?;
        if !host.contains('.') {
            return None;
        }
        path
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    let valid = |s: &str| !s.is_empty() && !s.chars().any(char::is_whitespace);
    if !valid(owner) || !valid(repo) {
        return None;
    }
    Some(RepoSlug {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Parse `url` and ask the repository host for its default branch.
pub fn resolve_default_branch(
    repos: &dyn RepositoryMetadata,
    url: &str,
) -> Result<(RepoSlug, BranchName), BranchError> {
    let slug = parse_repository_url(url).ok_or_else(|| BranchError::UnparsableUrl {
        url: url.to_string(),
    })?;
    match repos.default_branch(&slug.owner, &slug.repo) {
        Ok(branch) => {
            tracing::debug!("{slug}: default branch '{branch}'");
            Ok((slug, branch))
        }
        Err(source) => Err(BranchError::Remote {
            owner: slug.owner,
            repo: slug.repo,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use tagger_core::RemoteError;

    fn slug(owner: &str, repo: &str) -> Option<RepoSlug> {
        Some(RepoSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    #[test]
    fn parses_common_shapes() {
        let cases = [
            "https://github.com/acme/widgets",
            "https://github.com/acme/widgets.git",
            "https://github.com/acme/widgets/",
            "https://github.com/acme/widgets.git/",
            "http://github.com/acme/widgets",
            "https://token@github.com/acme/widgets",
            "ssh://git@github.com/acme/widgets.git",
            "git@github.com:acme/widgets.git",
            "git@github.com:acme/widgets",
            "github.com/acme/widgets",
            "https://github.com/acme/widgets/tree/main",
            "https://github.com/acme/widgets?tab=readme",
            "  https://github.com/acme/widgets  ",
        ];
        for url in cases {
            assert_eq!(parse_repository_url(url), slug("acme", "widgets"), "url: {url}");
        }
    }

    #[test]
    fn parses_enterprise_hosts() {
        assert_eq!(
            parse_repository_url("https://ghe.example.com/platform/api-gateway.git"),
            slug("platform", "api-gateway")
        );
        assert_eq!(
            parse_repository_url("git@ghe.example.com:platform/api-gateway.git"),
            slug("platform", "api-gateway")
        );
    }

    #[test]
    fn rejects_urls_without_owner_and_repo() {
        for url in [
            "",
            "not a url",
            "https://github.com",
            "https://github.com/",
            "https://github.com/acme",
            "git@github.com:acme",
            "acme/widgets",
            "https://github.com/acme/.git",
        ] {
            assert_eq!(parse_repository_url(url), None, "url: {url}");
        }
    }

    struct OneRepo {
        calls: RefCell<Vec<(String, String)>>,
        result: Result<BranchName, RemoteError>,
    }

    impl RepositoryMetadata for OneRepo {
        fn default_branch(&self, owner: &str, repo: &str) -> Result<BranchName, RemoteError> {
            self.calls
                .borrow_mut()
                .push((owner.to_string(), repo.to_string()));
            self.result.clone()
        }
    }

    #[test]
    fn unparsable_url_makes_no_remote_call() {
        let repos = OneRepo {
            calls: RefCell::new(vec![]),
            result: Ok(BranchName::from("main")),
        };
        let err = resolve_default_branch(&repos, "ftp:/nowhere").unwrap_err();
        assert!(matches!(err, BranchError::UnparsableUrl { .. }), "got: {err}");
        assert!(repos.calls.borrow().is_empty());
    }

    #[test]
    fn remote_failure_keeps_owner_repo_and_source() {
        let repos = OneRepo {
            calls: RefCell::new(vec![]),
            result: Err(RemoteError::Status {
                status: 404,
                url: "https://api.github.com/repos/acme/gone".to_string(),
                body: "Not Found".to_string(),
            }),
        };
        let err = resolve_default_branch(&repos, "https://github.com/acme/gone").unwrap_err();
        match err {
            BranchError::Remote { owner, repo, source } => {
                assert_eq!((owner.as_str(), repo.as_str()), ("acme", "gone"));
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn success_returns_slug_and_branch() {
        let repos = OneRepo {
            calls: RefCell::new(vec![]),
            result: Ok(BranchName::from("trunk")),
        };
        let (s, b) = resolve_default_branch(&repos, "git@github.com:acme/widgets.git").expect("ok");
        assert_eq!(s.to_string(), "acme/widgets");
        assert_eq!(b, BranchName::from("trunk"));
        assert_eq!(
            repos.calls.borrow().as_slice(),
            &[("acme".to_string(), "widgets".to_string())]
        );
    }
}
