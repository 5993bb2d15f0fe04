//! Run orchestrator: organizations → targets → projects.
//!
//! Strictly sequential. Every per-target and per-project failure is written
//! to the [`ErrorLedger`] and processing moves on; the only error returned
//! is the startup identity failure, before any organization is touched.

use tagger_core::{
    BranchName, DesiredTag, ErrorType, IntegrationType, OrgId, Organization, Project, ProjectId,
    RepositoryMetadata, SnykSource, TaggingSink, Target, TargetId, UserId,
};

use crate::branch::{self, RepoSlug};
use crate::error::{BranchError, FatalError};
use crate::identity;
use crate::ledger::{self, ErrorContext, ErrorLedger};
use crate::reconcile::{Decision, Reconciler};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Remote collaborators for one run.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub snyk: &'a dyn SnykSource,
    pub tagging: &'a dyn TaggingSink,
    pub repos: &'a dyn RepositoryMetadata,
}

/// Value written under the tag key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// The same value on every project.
    Fixed(String),
    /// Each project gets its target's default branch name.
    DefaultBranch,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub group_id: Option<String>,
    /// Allow-list passed to the target listing; empty means no filter.
    pub integration_types: Vec<IntegrationType>,
    pub tag_key: String,
    pub tag_value: TagValue,
    pub dry_run: bool,
}

impl RunOptions {
    fn desired_for(&self, default_branch: &BranchName) -> DesiredTag {
        match &self.tag_value {
            TagValue::Fixed(v) => DesiredTag::new(self.tag_key.clone(), v.clone()),
            TagValue::DefaultBranch => DesiredTag::new(self.tag_key.clone(), default_branch.0.clone()),
        }
    }

    fn allows(&self, target: &Target) -> bool {
        match target.integration_type {
            Some(t) if !self.integration_types.is_empty() => self.integration_types.contains(&t),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// How far a target got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    MissingUrl,
    BranchUnresolved,
    ProjectsUnavailable,
    Processed {
        repo: RepoSlug,
        default_branch: BranchName,
        /// Projects listed for the target, before branch filtering.
        candidates: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOutcome {
    pub project_id: ProjectId,
    pub project_name: String,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub org_id: OrgId,
    pub target_id: TargetId,
    pub repository_url: Option<String>,
    pub status: TargetStatus,
    /// Only projects on the default branch appear here.
    pub projects: Vec<ProjectOutcome>,
}

/// Everything a run did, for printing and assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub acting_user: UserId,
    pub dry_run: bool,
    pub organizations: Vec<Organization>,
    pub targets: Vec<TargetOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub organizations: usize,
    pub targets: usize,
    pub matched_projects: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub simulated: usize,
}

impl RunReport {
    pub fn totals(&self) -> Totals {
        let mut t = Totals {
            organizations: self.organizations.len(),
            targets: self.targets.len(),
            ..Totals::default()
        };
        for outcome in self.targets.iter().flat_map(|target| target.projects.iter()) {
            t.matched_projects += 1;
            if outcome.decision.is_simulated() {
                t.simulated += 1;
            }
            match outcome.decision {
                Decision::Skip => t.skipped += 1,
                Decision::Add { .. } => t.added += 1,
                Decision::Update { .. } => t.updated += 1,
                Decision::Fail(_) => t.failed += 1,
            }
        }
        t
    }

    /// Every project decision, in processing order.
    pub fn decisions(&self) -> impl Iterator<Item = (&ProjectId, &Decision)> {
        self.targets
            .iter()
            .flat_map(|t| t.projects.iter())
            .map(|p| (&p.project_id, &p.decision))
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Execute one reconciliation run, recording failures into `ledger`.
///
/// The caller flushes and summarizes the ledger afterwards.
pub fn run(
    sources: Sources<'_>,
    options: &RunOptions,
    ledger: &mut ErrorLedger,
) -> Result<RunReport, FatalError> {
    let acting_user = identity::resolve_fallback_user(sources.snyk)?;

    let organizations = match sources.snyk.list_organizations(options.group_id.as_deref()) {
        Ok(orgs) => orgs,
        Err(e) => {
            let mut ctx = ErrorContext::new();
            if let Some(group) = &options.group_id {
                ctx.insert("group_id".to_string(), group.clone());
            }
            ledger.record(
                ErrorType::MissingProjectDetails,
                format!("failed to list organizations: {e}"),
                ctx,
            );
            Vec::new()
        }
    };
    tracing::info!("{} organization(s) to process", organizations.len());

    let reconciler = Reconciler::new(sources.tagging, Some(&acting_user), options.dry_run);
    let mut targets = Vec::new();
    for org in &organizations {
        process_org(sources, options, &reconciler, org, ledger, &mut targets);
    }

    Ok(RunReport {
        acting_user: acting_user.clone(),
        dry_run: options.dry_run,
        organizations,
        targets,
    })
}

fn process_org(
    sources: Sources<'_>,
    options: &RunOptions,
    reconciler: &Reconciler<'_>,
    org: &Organization,
    ledger: &mut ErrorLedger,
    out: &mut Vec<TargetOutcome>,
) {
    tracing::info!("processing organization {} ({})", org.name, org.id);
    let targets = match sources.snyk.list_targets(org, &options.integration_types) {
        Ok(targets) => targets,
        Err(e) => {
            ledger.record(
                ErrorType::MissingProjectDetails,
                format!("failed to list targets: {e}"),
                ledger::org_context(org),
            );
            return;
        }
    };

    let before = out.len();
    for target in targets.iter().filter(|t| options.allows(t)) {
        out.push(process_target(sources, options, reconciler, org, target, ledger));
    }
    tracing::info!(
        "completed {} target(s) for organization {}",
        out.len() - before,
        org.name
    );
}

fn process_target(
    sources: Sources<'_>,
    options: &RunOptions,
    reconciler: &Reconciler<'_>,
    org: &Organization,
    target: &Target,
    ledger: &mut ErrorLedger,
) -> TargetOutcome {
    let mut outcome = TargetOutcome {
        org_id: org.id.clone(),
        target_id: target.id.clone(),
        repository_url: target.repository_url.clone(),
        status: TargetStatus::MissingUrl,
        projects: Vec::new(),
    };

    let Some(url) = target.repository_url.as_deref() else {
        ledger.record(
            ErrorType::MissingTargetUrl,
            format!("target {} has no repository URL", target.id),
            ledger::target_context(org, target),
        );
        return outcome;
    };

    let (repo, default_branch) = match branch::resolve_default_branch(sources.repos, url) {
        Ok(resolved) => resolved,
        Err(e) => {
            let mut ctx = ledger::target_context(org, target);
            if let BranchError::Remote { owner, repo, source } = &e {
                ctx.insert("owner".to_string(), owner.clone());
                ctx.insert("repo".to_string(), repo.clone());
                if let Some(status) = source.status() {
                    ctx.insert("status_code".to_string(), status.to_string());
                }
            }
            ledger.record(ErrorType::GithubApiError, e.to_string(), ctx);
            outcome.status = TargetStatus::BranchUnresolved;
            return outcome;
        }
    };

    let projects = match sources.snyk.list_projects(org, target) {
        Ok(projects) => projects,
        Err(e) => {
            ledger.record(
                ErrorType::MissingProjectDetails,
                format!("failed to list projects: {e}"),
                ledger::target_context(org, target),
            );
            outcome.status = TargetStatus::ProjectsUnavailable;
            return outcome;
        }
    };

    let matching: Vec<&Project> = projects
        .iter()
        .filter(|p| p.is_on_branch(&default_branch))
        .collect();
    tracing::info!(
        "{repo}: {} of {} project(s) on default branch '{default_branch}'",
        matching.len(),
        projects.len()
    );

    let desired = options.desired_for(&default_branch);
    for project in matching {
        let decision = reconciler.reconcile(org, project, &desired);
        if let Decision::Fail(reason) = &decision {
            let mut ctx = ledger::project_context(org, target, project);
            ctx.insert("tag".to_string(), desired.to_string());
            ledger.record(reason.error_type(), reason.to_string(), ctx);
        }
        outcome.projects.push(ProjectOutcome {
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            decision,
        });
    }

    outcome.status = TargetStatus::Processed {
        repo,
        default_branch,
        candidates: projects.len(),
    };
    outcome
}
