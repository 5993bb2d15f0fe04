//! Acting-user resolution for tag writes.
//!
//! Two steps: the project's own importer id, else the id of the token owner
//! fetched once at startup. The path taken is returned alongside the id.

use tagger_core::{Project, SnykSource, UserId};

use crate::error::{FatalError, MissingOwner};

/// Where a resolved owner id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSource {
    Project,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub id: UserId,
    pub source: OwnerSource,
}

/// Pick the user a write for `project` is attributed to.
pub fn resolve_owner_id(
    project: &Project,
    fallback: Option<&UserId>,
) -> Result<ResolvedOwner, MissingOwner> {
    if let Some(owner) = project.owner_id.as_ref().filter(|id| !id.is_empty()) {
        return Ok(ResolvedOwner {
            id: owner.clone(),
            source: OwnerSource::Project,
        });
    }
    match fallback.filter(|id| !id.is_empty()) {
        Some(id) => {
            tracing::info!(
                "project {} has no owner; using token user {id}",
                project.id
            );
            Ok(ResolvedOwner {
                id: id.clone(),
                source: OwnerSource::Fallback,
            })
        }
        None => Err(MissingOwner {
            project_id: project.id.clone(),
        }),
    }
}

/// Fetch the token owner's id. Called once, before any organization is listed.
pub fn resolve_fallback_user(snyk: &dyn SnykSource) -> Result<UserId, FatalError> {
    let id = snyk.authenticated_user_id().map_err(FatalError::Identity)?;
    if id.is_empty() {
        return Err(FatalError::EmptyIdentity);
    }
    tracing::info!("token user id: {id}");
    Ok(id)
}
