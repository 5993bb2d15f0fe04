//! GitHub repository metadata client.
//!
//! Works against github.com (`https://api.github.com`) and GitHub Enterprise
//! (`https://<host>/api/v3`).

use std::time::Duration;

use serde::Deserialize;
use tagger_core::{BranchName, RemoteError, RepositoryMetadata};

use crate::http::{self, decode, map_err};

/// Response from `GET /repos/{owner}/{repo}` (only fields we care about).
#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: Option<String>,
}

/// Blocking GitHub REST client.
pub struct GithubClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: http::agent(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}", self.base_url)
    }
}

impl RepositoryMetadata for GithubClient {
    fn default_branch(&self, owner: &str, repo: &str) -> Result<BranchName, RemoteError> {
        let url = self.repo_url(owner, repo);
        tracing::debug!("GET {url}");
        let resp = self
            .agent
            .get(&url)
            .set("Authorization", &format!("token {}", self.token))
            .set("Accept", "application/vnd.github.v3+json")
            .call()
            .map_err(|e| map_err(&url, e))?;
        let repo_info: RepoResponse = decode(&url, resp)?;
        branch_from(&url, repo_info)
    }
}

fn branch_from(url: &str, repo: RepoResponse) -> Result<BranchName, RemoteError> {
    match repo.default_branch {
        Some(b) if !b.trim().is_empty() => Ok(BranchName(b)),
        _ => Err(RemoteError::Malformed {
            url: url.to_string(),
            message: "repository has no default_branch".to_string(),
        }),
    }
}
