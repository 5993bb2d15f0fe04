//! Error ledger — the run's append-only record of recoverable failures.
//!
//! Persists a JSON array of [`ErrorRecord`]s, in the order recorded, at a
//! caller-chosen path. Writes use an atomic `.tmp` + rename. The ledger is an
//! observability sink only; nothing reads it back during a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagger_core::{ErrorType, Organization, Project, Target};

use crate::error::{io_err, LedgerError};

/// Identifiers known at the point of failure (`org_id`, `target_url`, …).
pub type ErrorContext = BTreeMap<String, String>;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub error_type: ErrorType,
    pub message: String,
    #[serde(default)]
    pub context: ErrorContext,
}

// ---------------------------------------------------------------------------
// Context helpers
// ---------------------------------------------------------------------------

pub fn org_context(org: &Organization) -> ErrorContext {
    let mut ctx = ErrorContext::new();
    ctx.insert("org_id".to_string(), org.id.0.clone());
    ctx.insert("org_name".to_string(), org.name.clone());
    ctx
}

pub fn target_context(org: &Organization, target: &Target) -> ErrorContext {
    let mut ctx = org_context(org);
    ctx.insert("target_id".to_string(), target.id.0.clone());
    if let Some(url) = &target.repository_url {
        ctx.insert("target_url".to_string(), url.clone());
    }
    if let Some(t) = target.integration_type {
        ctx.insert("integration_type".to_string(), t.to_string());
    }
    ctx
}

pub fn project_context(org: &Organization, target: &Target, project: &Project) -> ErrorContext {
    let mut ctx = target_context(org, target);
    ctx.insert("project_id".to_string(), project.id.0.clone());
    ctx.insert("project_name".to_string(), project.name.clone());
    ctx
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Failure counts per [`ErrorType`], always listing every type in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    counts: Vec<(ErrorType, usize)>,
}

impl Summary {
    pub fn from_records(records: &[ErrorRecord]) -> Self {
        let counts = ErrorType::ALL
            .into_iter()
            .map(|t| (t, records.iter().filter(|r| r.error_type == t).count()))
            .collect();
        Self { counts }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ErrorType, usize)> + '_ {
        self.counts.iter().copied()
    }

    pub fn count(&self, error_type: ErrorType) -> usize {
        self.counts
            .iter()
            .find(|(t, _)| *t == error_type)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ErrorLedger {
    records: Vec<ErrorRecord>,
    flushed_to: Option<PathBuf>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure stamped with the current time.
    pub fn record(&mut self, error_type: ErrorType, message: impl Into<String>, context: ErrorContext) {
        let message = message.into();
        tracing::warn!("{error_type}: {message}");
        self.records.push(ErrorRecord {
            timestamp: Utc::now(),
            error_type,
            message,
            context,
        });
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summarize(&self) -> Summary {
        Summary::from_records(&self.records)
    }

    /// Write every record to `path` as a JSON array. Allowed once per ledger.
    ///
    /// An empty ledger still writes `[]`.
    pub fn flush(&mut self, path: &Path) -> Result<(), LedgerError> {
        if let Some(previous) = &self.flushed_to {
            return Err(LedgerError::AlreadyFlushed {
                path: previous.clone(),
            });
        }
        save_at(path, &self.records)?;
        self.flushed_to = Some(path.to_path_buf());
        tracing::info!("error ledger ({} records) written to {}", self.len(), path.display());
        Ok(())
    }

    pub fn flushed_to(&self) -> Option<&Path> {
        self.flushed_to.as_deref()
    }
}

/// Atomically write `records` to `path`.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
fn save_at(path: &Path, records: &[ErrorRecord]) -> Result<(), LedgerError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(records)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Load a previously flushed ledger.
pub fn load(path: &Path) -> Result<Vec<ErrorRecord>, LedgerError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tagger_core::{OrgId, TargetId};
    use tempfile::TempDir;

    fn org() -> Organization {
        Organization {
            id: OrgId::from("o-1"),
            name: "Acme".to_string(),
        }
    }

    #[test]
    fn summary_lists_every_type_in_declaration_order() {
        let mut ledger = ErrorLedger::new();
        ledger.record(ErrorType::TaggingApiError, "a", ErrorContext::new());
        ledger.record(ErrorType::MissingTargetUrl, "b", ErrorContext::new());
        ledger.record(ErrorType::TaggingApiError, "c", ErrorContext::new());

        let summary = ledger.summarize();
        let order: Vec<ErrorType> = summary.iter().map(|(t, _)| t).collect();
        assert_eq!(order, ErrorType::ALL.to_vec());
        assert_eq!(summary.count(ErrorType::TaggingApiError), 2);
        assert_eq!(summary.count(ErrorType::MissingTargetUrl), 1);
        assert_eq!(summary.count(ErrorType::GithubApiError), 0);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn empty_ledger_flushes_empty_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("errors.json");
        let mut ledger = ErrorLedger::new();
        ledger.flush(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "[]");
        assert_eq!(ledger.flushed_to(), Some(path.as_path()));
    }

    #[test]
    fn flush_preserves_order_and_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("errors.log");
        let target = Target {
            id: TargetId::from("t-1"),
            repository_url: Some("https://github.com/acme/widgets".to_string()),
            integration_type: None,
        };

        let mut ledger = ErrorLedger::new();
        ledger.record(ErrorType::GithubApiError, "first", target_context(&org(), &target));
        ledger.record(ErrorType::MissingProjectDetails, "second", org_context(&org()));
        ledger.flush(&path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, ledger.records());
        assert_eq!(loaded[0].message, "first");
        assert_eq!(loaded[0].context.get("target_url").map(String::as_str), Some("https://github.com/acme/widgets"));
        assert_eq!(loaded[1].context.get("org_name").map(String::as_str), Some("Acme"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"error_type\": \"github_api_error\""), "got: {raw}");
    }

    #[test]
    fn second_flush_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("errors.json");
        let mut ledger = ErrorLedger::new();
        ledger.flush(&path).unwrap();
        let err = ledger.flush(&path).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyFlushed { .. }), "got: {err}");
    }

    #[test]
    fn tmp_file_cleaned_up_after_flush() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("errors.json");
        ErrorLedger::new().flush(&path).unwrap();
        let tmp_path = PathBuf::from(format!("{}.tmp", path.display()));
        assert!(!tmp_path.exists(), "tmp file should be removed after atomic rename");
    }

    #[test]
    fn records_carry_timestamps_in_order() {
        let before = Utc::now();
        let mut ledger = ErrorLedger::new();
        ledger.record(ErrorType::MissingOwnerId, "x", ErrorContext::new());
        ledger.record(ErrorType::MissingOwnerId, "y", ErrorContext::new());
        let after = Utc::now();

        let r = ledger.records();
        assert!(r[0].timestamp >= before && r[1].timestamp <= after);
        assert!(r[0].timestamp <= r[1].timestamp);
    }

    #[test]
    fn load_missing_file_is_io_error_with_path() {
        let tmp = TempDir::new().unwrap();
        let err = load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"), "got: {err}");
    }
}
