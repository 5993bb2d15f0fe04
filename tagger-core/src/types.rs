//! Domain types for the branch tagger.
//!
//! Everything here is plain data: the remote records we read (organizations,
//! targets, projects), the tag we want on them, and the closed set of error
//! kinds a run can record. All types are serializable via serde.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Snyk organization id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Snyk target id (one tracked repository link inside an organization).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Snyk project id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Id of the user a tag write is performed on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A git branch name as reported by the repository host.
///
/// Compared verbatim: `origin/main` and `main` are different branches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// SCM integration a target was imported through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationType {
    Github,
    GithubEnterprise,
    GithubCloudApp,
}

impl IntegrationType {
    pub const ALL: [IntegrationType; 3] = [
        IntegrationType::Github,
        IntegrationType::GithubEnterprise,
        IntegrationType::GithubCloudApp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Github => "github",
            IntegrationType::GithubEnterprise => "github-enterprise",
            IntegrationType::GithubCloudApp => "github-cloud-app",
        }
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntegrationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_owned())
    }
}

/// Every kind of recoverable failure a run can record.
///
/// Declaration order is the order summaries are printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    MissingTargetUrl,
    GithubApiError,
    MissingProjectDetails,
    MissingOwnerId,
    TaggingApiError,
}

impl ErrorType {
    pub const ALL: [ErrorType; 5] = [
        ErrorType::MissingTargetUrl,
        ErrorType::GithubApiError,
        ErrorType::MissingProjectDetails,
        ErrorType::MissingOwnerId,
        ErrorType::TaggingApiError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::MissingTargetUrl => "missing_target_url",
            ErrorType::GithubApiError => "github_api_error",
            ErrorType::MissingProjectDetails => "missing_project_details",
            ErrorType::MissingOwnerId => "missing_owner_id",
            ErrorType::TaggingApiError => "tagging_api_error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A single `key=value` tag on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The tag every matched project should carry after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredTag {
    pub key: String,
    pub value: String,
}

impl DesiredTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn as_tag(&self) -> Tag {
        Tag::new(self.key.clone(), self.value.clone())
    }
}

impl fmt::Display for DesiredTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A Snyk organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
}

/// A tracked repository inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    /// Absent for targets imported without a repository link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<IntegrationType>,
}

/// A Snyk project scanned from one branch of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    /// Branch the project was imported from (Snyk's `target_reference`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<BranchName>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Project {
    /// First tag with exactly `key`, if any.
    pub fn find_tag(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.key == key)
    }

    /// `true` when the project was imported from exactly `branch`.
    pub fn is_on_branch(&self, branch: &BranchName) -> bool {
        self.target_branch.as_ref() == Some(branch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn project(tags: Vec<Tag>) -> Project {
        Project {
            id: ProjectId::from("p-1"),
            name: "acme/widgets:package.json".to_string(),
            owner_id: None,
            target_branch: Some(BranchName::from("main")),
            tags,
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(OrgId::from("org").to_string(), "org");
        assert_eq!(ProjectId::from("p").to_string(), "p");
        assert_eq!(BranchName::from("main").to_string(), "main");
    }

    #[test]
    fn blank_user_id_is_empty() {
        assert!(UserId::from("  ").is_empty());
        assert!(!UserId::from("u-1").is_empty());
    }

    #[test]
    fn integration_type_parses_known_values_only() {
        assert_eq!(
            "github-cloud-app".parse::<IntegrationType>(),
            Ok(IntegrationType::GithubCloudApp)
        );
        assert_eq!(
            "gitlab".parse::<IntegrationType>(),
            Err("gitlab".to_string())
        );
    }

    #[test]
    fn error_type_serializes_snake_case() {
        let scalar = yaml_scalar(ErrorType::MissingProjectDetails);
        assert_eq!(scalar, "missing_project_details");
        assert_eq!(ErrorType::TaggingApiError.to_string(), "tagging_api_error");
    }

    fn yaml_scalar(t: ErrorType) -> String {
        serde_yaml::to_string(&t).expect("serialize").trim().to_string()
    }

    #[test]
    fn find_tag_is_case_sensitive_and_takes_first() {
        let p = project(vec![
            Tag::new("Default-Branch", "x"),
            Tag::new("default-branch", "main"),
            Tag::new("default-branch", "dev"),
        ]);
        assert_eq!(p.find_tag("default-branch").map(|t| t.value.as_str()), Some("main"));
        assert!(p.find_tag("DEFAULT-BRANCH").is_none());
    }

    #[test]
    fn branch_match_is_exact() {
        let p = project(vec![]);
        assert!(p.is_on_branch(&BranchName::from("main")));
        assert!(!p.is_on_branch(&BranchName::from("origin/main")));

        let unbranched = Project {
            target_branch: None,
            ..project(vec![])
        };
        assert!(!unbranched.is_on_branch(&BranchName::from("main")));
    }
}
