//! Snyk REST API client (JSON:API, `version`-dated endpoints).
//!
//! Read endpoints are paginated through `links.next`. Tag writes PATCH the
//! project with its complete tag list, so every write is computed from the
//! tags we read and carries all unrelated tags through unchanged.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tagger_core::{
    BranchName, DesiredTag, IntegrationType, OrgId, Organization, Project, ProjectId,
    RemoteError, SnykSource, Tag, TaggingSink, Target, TargetId, UserId,
};

use crate::http::{self, decode, follow_link, map_err};

const PAGE_LIMIT: &str = "100";
const JSON_API: &str = "application/vnd.api+json";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One page of a collection. A body without `data` is malformed, not empty.
#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SelfDocument {
    data: SelfData,
}

#[derive(Debug, Deserialize)]
struct SelfData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OrgResource {
    id: String,
    #[serde(default)]
    attributes: OrgAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct OrgAttributes {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TargetResource {
    id: String,
    #[serde(default)]
    attributes: TargetAttributes,
    #[serde(default)]
    relationships: TargetRelationships,
}

#[derive(Debug, Default, Deserialize)]
struct TargetAttributes {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TargetRelationships {
    integration: Option<Relationship<IntegrationData>>,
}

#[derive(Debug, Deserialize)]
struct Relationship<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct IntegrationData {
    #[serde(default)]
    attributes: IntegrationAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct IntegrationAttributes {
    integration_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectResource {
    id: String,
    #[serde(default)]
    attributes: ProjectAttributes,
    #[serde(default)]
    relationships: ProjectRelationships,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectAttributes {
    #[serde(default)]
    name: String,
    target_reference: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectRelationships {
    importer: Option<Relationship<UserRef>>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: Option<String>,
}

impl From<OrgResource> for Organization {
    fn from(r: OrgResource) -> Self {
        Organization {
            id: OrgId(r.id),
            name: r.attributes.name,
        }
    }
}

impl From<TargetResource> for Target {
    fn from(r: TargetResource) -> Self {
        let integration_type = r
            .relationships
            .integration
            .and_then(|rel| rel.data)
            .and_then(|d| d.attributes.integration_type)
            .and_then(|name| name.parse::<IntegrationType>().ok());
        Target {
            id: TargetId(r.id),
            repository_url: r.attributes.url.filter(|u| !u.trim().is_empty()),
            integration_type,
        }
    }
}

impl From<ProjectResource> for Project {
    fn from(r: ProjectResource) -> Self {
        let owner_id = r
            .relationships
            .importer
            .and_then(|rel| rel.data)
            .and_then(|u| u.id)
            .filter(|id| !id.trim().is_empty())
            .map(UserId);
        Project {
            id: ProjectId(r.id),
            name: r.attributes.name,
            owner_id,
            target_branch: r.attributes.target_reference.map(BranchName),
            tags: r.attributes.tags,
        }
    }
}

// ---------------------------------------------------------------------------
// Tag list construction
// ---------------------------------------------------------------------------

/// `existing` with `tag` appended.
pub fn tags_with_added(existing: &[Tag], tag: &DesiredTag) -> Vec<Tag> {
    let mut tags = existing.to_vec();
    tags.push(tag.as_tag());
    tags
}

/// `existing` with the first `key` entry set to `new_value`.
///
/// Later entries with the same key (bad upstream data) are dropped so the
/// written list has unique keys; every other tag is kept in order.
pub fn tags_with_updated(existing: &[Tag], key: &str, new_value: &str) -> Vec<Tag> {
    let mut seen = false;
    existing
        .iter()
        .filter_map(|t| {
            if t.key != key {
                return Some(t.clone());
            }
            if seen {
                return None;
            }
            seen = true;
            Some(Tag::new(key, new_value))
        })
        .collect()
}

/// JSON:API document for `PATCH /rest/orgs/{org}/projects/{id}`.
fn patch_body(project: &Project, tags: &[Tag], acting_user: &UserId) -> serde_json::Value {
    json!({
        "data": {
            "type": "project",
            "id": project.id.0,
            "attributes": { "tags": tags },
            "relationships": {
                "owner": { "data": { "id": acting_user.0, "type": "user" } }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking Snyk REST client.
pub struct SnykClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    version: String,
}

impl SnykClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        version: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: http::agent(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            version: version.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authed(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("token {}", self.token))
            .set("Accept", JSON_API)
    }

    /// GET every page of a collection starting at `path` with `params`.
    fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, RemoteError> {
        let first = format!("{}{path}", self.base_url);
        let mut request = self
            .authed("GET", &first)
            .query("version", &self.version)
            .query("limit", PAGE_LIMIT);
        for (k, v) in params {
            request = request.query(k, v);
        }

        let mut items = Vec::new();
        let mut url = first;
        let mut page_no = 1usize;
        loop {
            tracing::debug!("GET {url} (page {page_no})");
            let resp = request.call().map_err(|e| map_err(&url, e))?;
            let page: Page<T> = decode(&url, resp)?;
            items.extend(page.data);

            match follow_link(&self.base_url, &url, page.links.next.as_deref()) {
                Some(next) => {
                    request = self.authed("GET", &next);
                    url = next;
                    page_no += 1;
                }
                _ => break,
            }
        }
        Ok(items)
    }

    fn patch_tags(
        &self,
        org: &Organization,
        project: &Project,
        tags: Vec<Tag>,
        acting_user: &UserId,
    ) -> Result<(), RemoteError> {
        let url = format!(
            "{}/rest/orgs/{}/projects/{}",
            self.base_url, org.id, project.id
        );
        let body = patch_body(project, &tags, acting_user);
        tracing::debug!("PATCH {url}");
        self.authed("PATCH", &url)
            .set("Content-Type", JSON_API)
            .query("version", &self.version)
            .send_json(body)
            .map_err(|e| map_err(&url, e))?;
        Ok(())
    }
}

impl SnykSource for SnykClient {
    fn list_organizations(&self, group_id: Option<&str>) -> Result<Vec<Organization>, RemoteError> {
        let params: Vec<(&str, &str)> = group_id.map(|g| ("group_id", g)).into_iter().collect();
        let orgs: Vec<OrgResource> = self.get_all("/rest/orgs", &params)?;
        Ok(orgs.into_iter().map(Organization::from).collect())
    }

    fn list_targets(
        &self,
        org: &Organization,
        integration_types: &[IntegrationType],
    ) -> Result<Vec<Target>, RemoteError> {
        let source_types = integration_types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut params = Vec::new();
        if !source_types.is_empty() {
            params.push(("source_types", source_types.as_str()));
        }
        let path = format!("/rest/orgs/{}/targets", org.id);
        let targets: Vec<TargetResource> = self.get_all(&path, &params)?;
        Ok(targets.into_iter().map(Target::from).collect())
    }

    fn list_projects(
        &self,
        org: &Organization,
        target: &Target,
    ) -> Result<Vec<Project>, RemoteError> {
        let path = format!("/rest/orgs/{}/projects", org.id);
        let projects: Vec<ProjectResource> =
            self.get_all(&path, &[("target_id", target.id.0.as_str())])?;
        Ok(projects.into_iter().map(Project::from).collect())
    }

    fn authenticated_user_id(&self) -> Result<UserId, RemoteError> {
        let url = format!("{}/rest/self", self.base_url);
        let resp = self
            .authed("GET", &url)
            .query("version", &self.version)
            .call()
            .map_err(|e| map_err(&url, e))?;
        let doc: SelfDocument = decode(&url, resp)?;
        let id = UserId(doc.data.id);
        if id.is_empty() {
            return Err(RemoteError::Malformed {
                url,
                message: "token details carry an empty user id".to_string(),
            });
        }
        Ok(id)
    }
}

impl TaggingSink for SnykClient {
    fn create_tag(
        &self,
        org: &Organization,
        project: &Project,
        tag: &DesiredTag,
        acting_user: &UserId,
    ) -> Result<(), RemoteError> {
        self.patch_tags(org, project, tags_with_added(&project.tags, tag), acting_user)
    }

    fn update_tag(
        &self,
        org: &Organization,
        project: &Project,
        key: &str,
        _old_value: &str,
        new_value: &str,
        acting_user: &UserId,
    ) -> Result<(), RemoteError> {
        self.patch_tags(
            org,
            project,
            tags_with_updated(&project.tags, key, new_value),
            acting_user,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
