//! # tagger-api
//!
//! Blocking HTTP clients (ureq) implementing the `tagger-core` source traits:
//! [`SnykClient`] for organizations, targets, projects, identity and tag
//! writes; [`GithubClient`] for repository default branches.

mod http;
pub mod github;
pub mod snyk;

pub use github::GithubClient;
pub use snyk::SnykClient;
