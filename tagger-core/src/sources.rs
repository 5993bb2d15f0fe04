//! Remote collaborators consumed by the tagging pipeline.
//!
//! `tagger-api` implements these over HTTP; tests implement them in memory.
//! Every call is a single blocking attempt with no retries at this layer.

use crate::error::RemoteError;
use crate::types::{
    BranchName, DesiredTag, IntegrationType, Organization, Project, Target, UserId,
};

/// Read side of Snyk: organizations, targets, projects and the caller's identity.
pub trait SnykSource {
    /// All organizations visible to the token, optionally restricted to one group.
    fn list_organizations(&self, group_id: Option<&str>) -> Result<Vec<Organization>, RemoteError>;

    /// Targets of `org`, restricted to `integration_types` when non-empty.
    fn list_targets(
        &self,
        org: &Organization,
        integration_types: &[IntegrationType],
    ) -> Result<Vec<Target>, RemoteError>;

    /// Projects imported from `target`.
    fn list_projects(&self, org: &Organization, target: &Target)
        -> Result<Vec<Project>, RemoteError>;

    /// Id of the user the token belongs to.
    fn authenticated_user_id(&self) -> Result<UserId, RemoteError>;
}

/// Write side of Snyk tagging.
///
/// Implementations must leave every tag other than the one named untouched.
pub trait TaggingSink {
    fn create_tag(
        &self,
        org: &Organization,
        project: &Project,
        tag: &DesiredTag,
        acting_user: &UserId,
    ) -> Result<(), RemoteError>;

    /// Replace `key=old_value` with `key=new_value`.
    fn update_tag(
        &self,
        org: &Organization,
        project: &Project,
        key: &str,
        old_value: &str,
        new_value: &str,
        acting_user: &UserId,
    ) -> Result<(), RemoteError>;
}

/// Repository host metadata (GitHub / GitHub Enterprise).
pub trait RepositoryMetadata {
    fn default_branch(&self, owner: &str, repo: &str) -> Result<BranchName, RemoteError>;
}
