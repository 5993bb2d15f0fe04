//! Per-project tag reconciliation.
//!
//! ## Decision order
//!
//! 1. Resolve the acting owner. No owner means `Fail(MissingOwnerId)` and no write.
//! 2. Find the first tag whose key equals the desired key (exact match).
//! 3. Absent → Add. Same value → Skip (no remote call). Other value → Update.
//! 4. Dry run stops before the remote call and flags the decision `simulated`.
//! 5. A failed remote write → `Fail(TaggingApi)`.

use std::fmt;

use tagger_core::{DesiredTag, ErrorType, Organization, Project, RemoteError, TaggingSink, UserId};

use crate::identity::{resolve_owner_id, OwnerSource};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// What a project needs, judged from its tags alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPlan<'a> {
    /// The desired tag is already present with the desired value.
    Skip,
    /// No tag with the desired key exists.
    Add,
    /// A tag with the desired key exists with a different value.
    Update { old_value: &'a str },
}

/// Compare `project`'s tags against `desired`. First match wins on duplicate keys.
pub fn plan<'a>(project: &'a Project, desired: &DesiredTag) -> TagPlan<'a> {
    match project.find_tag(&desired.key) {
        None => TagPlan::Add,
        Some(tag) if tag.value == desired.value => TagPlan::Skip,
        Some(tag) => TagPlan::Update {
            old_value: &tag.value,
        },
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a project could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    MissingOwnerId,
    TaggingApi(RemoteError),
}

impl FailReason {
    pub fn error_type(&self) -> ErrorType {
        match self {
            FailReason::MissingOwnerId => ErrorType::MissingOwnerId,
            FailReason::TaggingApi(_) => ErrorType::TaggingApiError,
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::MissingOwnerId => {
                f.write_str("project has no owner id and no fallback user is available")
            }
            FailReason::TaggingApi(e) => write!(f, "tag write failed: {e}"),
        }
    }
}

/// Outcome of reconciling one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Tag already correct; nothing was sent.
    Skip,
    /// Tag created (or, when `simulated`, would have been).
    Add { simulated: bool },
    /// Tag value replaced (or, when `simulated`, would have been).
    Update { old_value: String, simulated: bool },
    Fail(FailReason),
}

impl Decision {
    pub fn is_simulated(&self) -> bool {
        matches!(
            self,
            Decision::Add { simulated: true } | Decision::Update { simulated: true, .. }
        )
    }

    /// Same decision with the dry-run flag cleared; lets tests compare runs.
    pub fn without_simulation(&self) -> Decision {
        match self {
            Decision::Add { .. } => Decision::Add { simulated: false },
            Decision::Update { old_value, .. } => Decision::Update {
                old_value: old_value.clone(),
                simulated: false,
            },
            other => other.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Applies a desired tag to projects through a [`TaggingSink`].
pub struct Reconciler<'a> {
    sink: &'a dyn TaggingSink,
    fallback_user: Option<&'a UserId>,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(sink: &'a dyn TaggingSink, fallback_user: Option<&'a UserId>, dry_run: bool) -> Self {
        Self {
            sink,
            fallback_user,
            dry_run,
        }
    }

    pub fn reconcile(&self, org: &Organization, project: &Project, desired: &DesiredTag) -> Decision {
        let owner = match resolve_owner_id(project, self.fallback_user) {
            Ok(owner) => owner,
            Err(_) => return Decision::Fail(FailReason::MissingOwnerId),
        };
        if owner.source == OwnerSource::Fallback {
            tracing::debug!("project {}: writing as fallback user", project.id);
        }

        match plan(project, desired) {
            TagPlan::Skip => {
                tracing::debug!("project {}: {desired} already present", project.id);
                Decision::Skip
            }
            TagPlan::Add => {
                if self.dry_run {
                    tracing::info!("[dry-run] would add {desired} to project {}", project.id);
                    return Decision::Add { simulated: true };
                }
                match self.sink.create_tag(org, project, desired, &owner.id) {
                    Ok(()) => {
                        tracing::info!("added {desired} to project {}", project.id);
                        Decision::Add { simulated: false }
                    }
                    Err(e) => Decision::Fail(FailReason::TaggingApi(e)),
                }
            }
            TagPlan::Update { old_value } => {
                if self.dry_run {
                    tracing::info!(
                        "[dry-run] would update {} on project {} from '{old_value}' to '{}'",
                        desired.key,
                        project.id,
                        desired.value
                    );
                    return Decision::Update {
                        old_value: old_value.to_string(),
                        simulated: true,
                    };
                }
                match self.sink.update_tag(
                    org,
                    project,
                    &desired.key,
                    old_value,
                    &desired.value,
                    &owner.id,
                ) {
                    Ok(()) => {
                        tracing::info!(
                            "updated {} on project {} from '{old_value}' to '{}'",
                            desired.key,
                            project.id,
                            desired.value
                        );
                        Decision::Update {
                            old_value: old_value.to_string(),
                            simulated: false,
                        }
                    }
                    Err(e) => Decision::Fail(FailReason::TaggingApi(e)),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
