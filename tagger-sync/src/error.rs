//! Error types for tagger-sync.

use std::path::PathBuf;

use thiserror::Error;

use tagger_core::{ProjectId, RemoteError};

/// The one failure that aborts a run: no acting user could be established.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("could not resolve the authenticated Snyk user: {0}")]
    Identity(#[source] RemoteError),

    #[error("the authenticated Snyk user has an empty id")]
    EmptyIdentity,
}

/// A target's default branch could not be determined.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BranchError {
    /// The repository URL did not yield an `owner/repo` pair.
    #[error("could not extract owner/repo from repository URL '{url}'")]
    UnparsableUrl { url: String },

    /// The repository host rejected or failed the lookup.
    #[error("default branch lookup for {owner}/{repo} failed: {source}")]
    Remote {
        owner: String,
        repo: String,
        #[source]
        source: RemoteError,
    },
}

/// Neither the project nor the run could supply an owner for a tag write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("project {project_id} has no owner and no fallback user is available")]
pub struct MissingOwner {
    pub project_id: ProjectId,
}

/// Errors persisting or loading the error ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `flush` is called exactly once per run.
    #[error("error ledger already flushed to {path}")]
    AlreadyFlushed { path: PathBuf },
}

/// Convenience constructor for [`LedgerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.into(),
        source,
    }
}
