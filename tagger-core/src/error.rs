//! Error types for tagger-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load; carries the file path and serde_yaml line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("unknown Snyk region '{region}'; expected one of: {valid}")]
    UnknownRegion { region: String, valid: String },

    #[error("invalid integration types: {invalid:?}; valid types are: {valid}")]
    InvalidIntegrationTypes { invalid: Vec<String>, valid: String },

    #[error("at least one integration type is required (--integration-type)")]
    NoIntegrationTypes,

    #[error("a tag key is required (--key or `tag_key` in the config file)")]
    MissingTagKey,

    #[error("{0} environment variable is required")]
    MissingToken(&'static str),
}

/// Failure talking to a remote API (Snyk or GitHub).
///
/// Produced by the HTTP clients and by test doubles alike; the orchestrator
/// only ever turns these into ledger records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response arrived but could not be decoded or lacked a required field.
    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

impl RemoteError {
    /// HTTP status code, when the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            RemoteError::Status { url, .. }
            | RemoteError::Transport { url, .. }
            | RemoteError::Malformed { url, .. } => url,
        }
    }
}
