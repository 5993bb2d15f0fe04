//! Branch tagger core library — domain types, configuration, remote traits, errors.
//!
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`ConfigError`], [`RemoteError`]
//! - [`config`] — YAML config file + flag merging into [`config::Settings`]
//! - [`sources`] — traits the pipeline consumes; implemented by `tagger-api`

pub mod config;
pub mod error;
pub mod sources;
pub mod types;

pub use error::{ConfigError, RemoteError};
pub use sources::{RepositoryMetadata, SnykSource, TaggingSink};
pub use types::{
    BranchName, DesiredTag, ErrorType, IntegrationType, OrgId, Organization, Project, ProjectId,
    Tag, Target, TargetId, UserId,
};
