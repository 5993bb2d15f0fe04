//! In-memory Snyk and GitHub doubles.
//!
//! `FakeSnyk` applies tag writes to its own project state, so a second run
//! over the same world sees the first run's effects.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use tagger_core::{
    BranchName, DesiredTag, IntegrationType, OrgId, Organization, Project, ProjectId,
    RemoteError, RepositoryMetadata, SnykSource, Tag, TaggingSink, Target, TargetId, UserId,
};
use tagger_sync::{pipeline::Sources, RunOptions, TagValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Create {
        project: String,
        tag: Tag,
        user: String,
    },
    Update {
        project: String,
        key: String,
        old: String,
        new: String,
        user: String,
    },
}

pub fn remote_500(url: &str) -> RemoteError {
    RemoteError::Status {
        status: 500,
        url: url.to_string(),
        body: "internal error".to_string(),
    }
}

pub fn malformed(url: &str) -> RemoteError {
    RemoteError::Malformed {
        url: url.to_string(),
        message: "missing field `data`".to_string(),
    }
}

pub fn remote_404(url: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        url: url.to_string(),
        body: "Not Found".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Snyk
// ---------------------------------------------------------------------------

pub struct FakeSnyk {
    pub user: Result<UserId, RemoteError>,
    pub orgs: Vec<Organization>,
    pub targets: HashMap<OrgId, Vec<Target>>,
    pub projects: RefCell<HashMap<TargetId, Vec<Project>>>,
    pub fail_orgs: bool,
    pub fail_targets: HashSet<OrgId>,
    pub fail_projects: HashMap<TargetId, RemoteError>,
    pub fail_writes: HashSet<ProjectId>,
    pub writes: RefCell<Vec<Write>>,
    pub project_lists: RefCell<Vec<TargetId>>,
    pub target_lists: RefCell<Vec<(OrgId, Vec<IntegrationType>)>>,
}

impl Default for FakeSnyk {
    fn default() -> Self {
        Self {
            user: Ok(UserId::from("token-user")),
            orgs: Vec::new(),
            targets: HashMap::new(),
            projects: RefCell::new(HashMap::new()),
            fail_orgs: false,
            fail_targets: HashSet::new(),
            fail_projects: HashMap::new(),
            fail_writes: HashSet::new(),
            writes: RefCell::new(Vec::new()),
            project_lists: RefCell::new(Vec::new()),
            target_lists: RefCell::new(Vec::new()),
        }
    }
}

impl FakeSnyk {
    pub fn with_org(mut self, id: &str, name: &str) -> Self {
        self.orgs.push(Organization {
            id: OrgId::from(id),
            name: name.to_string(),
        });
        self
    }

    pub fn with_target(mut self, org: &str, target: Target, projects: Vec<Project>) -> Self {
        self.projects
            .borrow_mut()
            .insert(target.id.clone(), projects);
        self.targets.entry(OrgId::from(org)).or_default().push(target);
        self
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.projects
            .borrow()
            .values()
            .flatten()
            .find(|p| p.id.0 == id)
            .cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    fn apply<F: FnOnce(&mut Project)>(&self, id: &ProjectId, f: F) {
        let mut all = self.projects.borrow_mut();
        if let Some(p) = all.values_mut().flatten().find(|p| &p.id == id) {
            f(p);
        }
    }
}

impl SnykSource for FakeSnyk {
    fn list_organizations(&self, _group_id: Option<&str>) -> Result<Vec<Organization>, RemoteError> {
        if self.fail_orgs {
            return Err(remote_500("https://api.snyk.io/rest/orgs"));
        }
        Ok(self.orgs.clone())
    }

    fn list_targets(
        &self,
        org: &Organization,
        integration_types: &[IntegrationType],
    ) -> Result<Vec<Target>, RemoteError> {
        self.target_lists
            .borrow_mut()
            .push((org.id.clone(), integration_types.to_vec()));
        if self.fail_targets.contains(&org.id) {
            return Err(remote_500("https://api.snyk.io/rest/orgs/x/targets"));
        }
        Ok(self.targets.get(&org.id).cloned().unwrap_or_default())
    }

    fn list_projects(&self, _org: &Organization, target: &Target) -> Result<Vec<Project>, RemoteError> {
        self.project_lists.borrow_mut().push(target.id.clone());
        if let Some(err) = self.fail_projects.get(&target.id) {
            return Err(err.clone());
        }
        Ok(self
            .projects
            .borrow()
            .get(&target.id)
            .cloned()
            .unwrap_or_default())
    }

    fn authenticated_user_id(&self) -> Result<UserId, RemoteError> {
        self.user.clone()
    }
}

impl TaggingSink for FakeSnyk {
    fn create_tag(
        &self,
        _org: &Organization,
        project: &Project,
        tag: &DesiredTag,
        acting_user: &UserId,
    ) -> Result<(), RemoteError> {
        self.writes.borrow_mut().push(Write::Create {
            project: project.id.0.clone(),
            tag: tag.as_tag(),
            user: acting_user.0.clone(),
        });
        if self.fail_writes.contains(&project.id) {
            return Err(remote_500("https://api.snyk.io/rest/orgs/x/projects/y"));
        }
        let tag = tag.as_tag();
        self.apply(&project.id, |p| p.tags.push(tag));
        Ok(())
    }

    fn update_tag(
        &self,
        _org: &Organization,
        project: &Project,
        key: &str,
        old_value: &str,
        new_value: &str,
        acting_user: &UserId,
    ) -> Result<(), RemoteError> {
        self.writes.borrow_mut().push(Write::Update {
            project: project.id.0.clone(),
            key: key.to_string(),
            old: old_value.to_string(),
            new: new_value.to_string(),
            user: acting_user.0.clone(),
        });
        if self.fail_writes.contains(&project.id) {
            return Err(remote_500("https://api.snyk.io/rest/orgs/x/projects/y"));
        }
        self.apply(&project.id, |p| {
            if let Some(t) = p.tags.iter_mut().find(|t| t.key == key) {
                t.value = new_value.to_string();
            }
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeGithub {
    pub repos: HashMap<(String, String), Result<BranchName, RemoteError>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeGithub {
    pub fn with_repo(mut self, owner: &str, repo: &str, branch: &str) -> Self {
        self.repos.insert(
            (owner.to_string(), repo.to_string()),
            Ok(BranchName::from(branch)),
        );
        self
    }

    pub fn with_failure(mut self, owner: &str, repo: &str, err: RemoteError) -> Self {
        self.repos
            .insert((owner.to_string(), repo.to_string()), Err(err));
        self
    }
}

impl RepositoryMetadata for FakeGithub {
    fn default_branch(&self, owner: &str, repo: &str) -> Result<BranchName, RemoteError> {
        self.calls.borrow_mut().push(format!("{owner}/{repo}"));
        self.repos
            .get(&(owner.to_string(), repo.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                Err(remote_404(&format!(
                    "https://api.github.com/repos/{owner}/{repo}"
                )))
            })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn target(id: &str, url: Option<&str>) -> Target {
    Target {
        id: TargetId::from(id),
        repository_url: url.map(str::to_string),
        integration_type: Some(IntegrationType::Github),
    }
}

pub fn project(id: &str, branch: &str, owner: Option<&str>, tags: Vec<Tag>) -> Project {
    Project {
        id: ProjectId::from(id),
        name: format!("{id}:package.json"),
        owner_id: owner.map(UserId::from),
        target_branch: Some(BranchName::from(branch)),
        tags,
    }
}

pub fn options(value: TagValue, dry_run: bool) -> RunOptions {
    RunOptions {
        group_id: None,
        integration_types: vec![IntegrationType::Github],
        tag_key: "default-branch".to_string(),
        tag_value: value,
        dry_run,
    }
}

pub fn sources<'a>(snyk: &'a FakeSnyk, github: &'a FakeGithub) -> Sources<'a> {
    Sources {
        snyk,
        tagging: snyk,
        repos: github,
    }
}
