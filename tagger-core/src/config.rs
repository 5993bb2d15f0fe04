//! Run configuration.
//!
//! # Sources, highest precedence first
//!
//! 1. CLI flags (and the `SNYK_TOKEN` / `GITHUB_TOKEN` environment variables,
//!    which clap folds into the same [`Overrides`]).
//! 2. YAML config file — `--config <path>` or `~/.branch-tagger/config.yaml`.
//! 3. Built-in defaults.
//!
//! # API pattern
//!
//! Like the rest of the crate, file helpers come in two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::IntegrationType;

pub const DEFAULT_GITHUB_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_ERROR_LOG: &str = "tagging_errors.log";
pub const DEFAULT_API_VERSION: &str = "2024-10-15";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// 1. Region
// ---------------------------------------------------------------------------

/// Snyk data-residency region; selects the REST base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Region {
    #[default]
    #[serde(rename = "SNYK-US-01")]
    Us01,
    #[serde(rename = "SNYK-US-02")]
    Us02,
    #[serde(rename = "SNYK-EU-01")]
    Eu01,
    #[serde(rename = "SNYK-AU-01")]
    Au01,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Us01, Region::Us02, Region::Eu01, Region::Au01];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us01 => "SNYK-US-01",
            Region::Us02 => "SNYK-US-02",
            Region::Eu01 => "SNYK-EU-01",
            Region::Au01 => "SNYK-AU-01",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us01 => "https://api.snyk.io",
            Region::Us02 => "https://api.us.snyk.io",
            Region::Eu01 => "https://api.eu.snyk.io",
            Region::Au01 => "https://api.au.snyk.io",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownRegion {
                region: s.to_owned(),
                valid: Region::ALL.map(|r| r.as_str()).join(", "),
            })
    }
}

// ---------------------------------------------------------------------------
// 2. Integration types
// ---------------------------------------------------------------------------

/// Parse and validate a list of integration type names.
///
/// Every invalid name is reported at once. Duplicates collapse, first
/// occurrence wins the position.
pub fn validate_integration_types(
    names: &[String],
) -> Result<Vec<IntegrationType>, ConfigError> {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for name in names {
        match name.parse::<IntegrationType>() {
            Ok(t) if !valid.contains(&t) => valid.push(t),
            Ok(_) => {}
            Err(bad) => invalid.push(bad),
        }
    }
    if !invalid.is_empty() {
        return Err(ConfigError::InvalidIntegrationTypes {
            invalid,
            valid: IntegrationType::ALL.map(|t| t.as_str()).join(", "),
        });
    }
    Ok(valid)
}

// ---------------------------------------------------------------------------
// 3. Config file
// ---------------------------------------------------------------------------

/// On-disk YAML config. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// `<home>/.branch-tagger/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".branch-tagger").join("config.yaml")
}

/// Load an explicitly requested config file.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.branch-tagger/config.yaml` if it exists, else defaults.
pub fn load_default_at(home: &Path) -> Result<FileConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    load_at(&path)
}

/// `load_default_at` convenience wrapper.
pub fn load_default() -> Result<FileConfig, ConfigError> {
    load_default_at(&home()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 4. Merged settings
// ---------------------------------------------------------------------------

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub github_base_url: Option<String>,
    pub integration_types: Vec<String>,
    pub group_id: Option<String>,
    pub tag_key: Option<String>,
    pub tag_value: Option<String>,
    pub error_log: Option<PathBuf>,
    pub dry_run: bool,
    pub snyk_token: Option<String>,
    pub github_token: Option<String>,
}

/// API tokens. `Debug` never prints the secrets.
#[derive(Clone)]
pub struct Credentials {
    pub snyk_token: String,
    pub github_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("snyk_token", &"<redacted>")
            .field("github_token", &"<redacted>")
            .finish()
    }
}

/// Fully validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub region: Region,
    pub github_base_url: String,
    pub integration_types: Vec<IntegrationType>,
    pub group_id: Option<String>,
    pub tag_key: String,
    /// Uniform tag value; `None` tags each project with its target's default branch.
    pub tag_value: Option<String>,
    pub error_log: PathBuf,
    pub timeout: Duration,
    pub api_version: String,
    pub dry_run: bool,
    pub credentials: Credentials,
}

impl Settings {
    /// Merge `overrides` over `file` and validate the result.
    ///
    /// Validation order mirrors what a user fixes first: region, integration
    /// types, tag key, then tokens.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let region = match overrides.region.or(file.region) {
            Some(name) => name.parse::<Region>()?,
            None => Region::default(),
        };

        let type_names = if overrides.integration_types.is_empty() {
            file.integration_types.unwrap_or_default()
        } else {
            overrides.integration_types
        };
        let integration_types = validate_integration_types(&type_names)?;
        if integration_types.is_empty() {
            return Err(ConfigError::NoIntegrationTypes);
        }

        let tag_key = overrides
            .tag_key
            .or(file.tag_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingTagKey)?;

        let snyk_token = non_empty(overrides.snyk_token).ok_or(ConfigError::MissingToken("SNYK_TOKEN"))?;
        let github_token =
            non_empty(overrides.github_token).ok_or(ConfigError::MissingToken("GITHUB_TOKEN"))?;

        let github_base_url = overrides
            .github_base_url
            .or(file.github_base_url)
            .unwrap_or_else(|| DEFAULT_GITHUB_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            region,
            github_base_url,
            integration_types,
            group_id: overrides.group_id.or(file.group_id),
            tag_key,
            tag_value: overrides.tag_value,
            error_log: overrides
                .error_log
                .or(file.error_log)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_LOG)),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            api_version: file
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            dry_run: overrides.dry_run,
            credentials: Credentials {
                snyk_token,
                github_token,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
