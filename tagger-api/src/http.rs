//! Shared ureq plumbing: agent construction, error mapping, pagination links.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tagger_core::RemoteError;

/// User-Agent sent to both APIs (GitHub rejects requests without one).
pub(crate) const USER_AGENT: &str = concat!("branch-tagger/", env!("CARGO_PKG_VERSION"));

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Convert a ureq failure into a [`RemoteError`], keeping status and body.
pub(crate) fn map_err(url: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, resp) => RemoteError::Status {
            status,
            url: url.to_string(),
            body: truncate(&resp.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(t) => RemoteError::Transport {
            url: url.to_string(),
            message: t.to_string(),
        },
    }
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, resp: ureq::Response) -> Result<T, RemoteError> {
    resp.into_json::<T>().map_err(|e| RemoteError::Malformed {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Resolve a JSON:API `links.next` value against `base_url`.
///
/// Absolute links are used as is; relative links are joined to the base.
pub(crate) fn next_page_url(base_url: &str, next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.is_empty() {
        return None;
    }
    if next.starts_with("http://") || next.starts_with("https://") {
        Some(next.to_string())
    } else if next.starts_with('/') {
        Some(format!("{base_url}{next}"))
    } else {
        Some(format!("{base_url}/{}", next.trim_start_matches('/')))
    }
}

/// Next page to fetch after `current`, if any. A link back to `current` ends the walk.
pub(crate) fn follow_link(base_url: &str, current: &str, next: Option<&str>) -> Option<String> {
    next_page_url(base_url, next).filter(|n| n != current)
}

pub(crate) fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(MAX_ERROR_BODY).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_next_link_used_as_is() {
        let got = next_page_url("https://api.snyk.io", Some("https://api.eu.snyk.io/rest/orgs?x=1"));
        assert_eq!(got.as_deref(), Some("https://api.eu.snyk.io/rest/orgs?x=1"));
    }

    #[test]
    fn rooted_next_link_joined_to_base() {
        let got = next_page_url("https://api.snyk.io", Some("/rest/orgs?starting_after=abc"));
        assert_eq!(got.as_deref(), Some("https://api.snyk.io/rest/orgs?starting_after=abc"));
    }

    #[test]
    fn bare_next_link_gets_a_slash() {
        let got = next_page_url("https://api.snyk.io", Some("rest/orgs?starting_after=abc"));
        assert_eq!(got.as_deref(), Some("https://api.snyk.io/rest/orgs?starting_after=abc"));
    }

    #[test]
    fn missing_or_blank_next_link_ends_pagination() {
        assert!(next_page_url("https://api.snyk.io", None).is_none());
        assert!(next_page_url("https://api.snyk.io", Some("  ")).is_none());
    }

    #[test]
    fn pagination_follows_new_links_and_stops_on_repeats() {
        let base = "https://api.snyk.io";
        let first = "https://api.snyk.io/rest/orgs";
        let second = follow_link(base, first, Some("/rest/orgs?starting_after=o-1"));
        assert_eq!(second.as_deref(), Some("https://api.snyk.io/rest/orgs?starting_after=o-1"));

        let current = second.unwrap();
        assert!(follow_link(base, &current, Some("/rest/orgs?starting_after=o-1")).is_none());
        assert!(follow_link(base, &current, None).is_none());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let cut = truncate(&body);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }
}
