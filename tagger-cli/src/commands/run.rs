//! `branch-tagger run` — one reconciliation pass over every organization.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tagger_api::{GithubClient, SnykClient};
use tagger_core::config::{self, Overrides, Settings};
use tagger_sync::{
    pipeline::{self, Sources, TargetStatus},
    Decision, ErrorLedger, RunOptions, RunReport, TagValue,
};

/// Arguments for `branch-tagger run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Tag key to reconcile (e.g. "default-branch").
    #[arg(long)]
    pub key: Option<String>,

    /// Tag value for every project; defaults to each repository's default branch.
    #[arg(long)]
    pub value: Option<String>,

    /// Integration type to include: github | github-enterprise | github-cloud-app.
    /// Several may follow one flag, space- or comma-separated.
    #[arg(
        long = "integration-type",
        value_name = "TYPE",
        num_args = 1..,
        value_delimiter = ','
    )]
    pub integration_types: Vec<String>,

    /// Only process organizations in this Snyk group.
    #[arg(long)]
    pub group_id: Option<String>,

    /// Snyk region, e.g. SNYK-US-01 or SNYK-EU-01.
    #[arg(long)]
    pub region: Option<String>,

    /// GitHub API base URL (GitHub Enterprise: https://<host>/api/v3).
    #[arg(long, value_name = "URL")]
    pub github_base_url: Option<String>,

    /// Where to write the JSON error log.
    #[arg(long, value_name = "PATH")]
    pub error_log: Option<PathBuf>,

    /// Decide every tag change without writing any.
    #[arg(long)]
    pub dry_run: bool,

    /// Config file to use instead of ~/.branch-tagger/config.yaml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SNYK_TOKEN", hide = true, hide_env_values = true)]
    pub snyk_token: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide = true, hide_env_values = true)]
    pub github_token: Option<String>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let file = match &self.config {
            Some(path) => config::load_at(path),
            None => config::load_default(),
        }
        .context("failed to load configuration")?;
        let settings = Settings::resolve(file, self.into_overrides()).context("invalid configuration")?;
        tracing::debug!("settings: {settings:?}");

        let snyk = SnykClient::new(
            settings.region.base_url(),
            &settings.credentials.snyk_token,
            &settings.api_version,
            settings.timeout,
        );
        let github = GithubClient::new(
            &settings.github_base_url,
            &settings.credentials.github_token,
            settings.timeout,
        );
        let sources = Sources {
            snyk: &snyk,
            tagging: &snyk,
            repos: &github,
        };
        let options = RunOptions {
            group_id: settings.group_id.clone(),
            integration_types: settings.integration_types.clone(),
            tag_key: settings.tag_key.clone(),
            tag_value: match &settings.tag_value {
                Some(v) => TagValue::Fixed(v.clone()),
                None => TagValue::DefaultBranch,
            },
            dry_run: settings.dry_run,
        };

        tracing::info!(
            "region {} ({}), integration types: {}",
            settings.region,
            snyk.base_url(),
            options
                .integration_types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut ledger = ErrorLedger::new();
        let report = pipeline::run(sources, &options, &mut ledger).context("run aborted")?;

        print_report(&report);
        super::print_summary(&ledger.summarize());
        ledger
            .flush(&settings.error_log)
            .with_context(|| format!("failed to write error log to {}", settings.error_log.display()))?;
        if let Some(path) = ledger.flushed_to() {
            println!("Error log written to {}", path.display());
        }
        Ok(())
    }

    fn into_overrides(self) -> Overrides {
        Overrides {
            region: self.region,
            github_base_url: self.github_base_url,
            integration_types: self.integration_types,
            group_id: self.group_id,
            tag_key: self.key,
            tag_value: self.value,
            error_log: self.error_log,
            dry_run: self.dry_run,
            snyk_token: self.snyk_token,
            github_token: self.github_token,
        }
    }
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    for target in &report.targets {
        let TargetStatus::Processed {
            repo,
            default_branch,
            ..
        } = &target.status
        else {
            continue;
        };
        let changed: Vec<_> = target
            .projects
            .iter()
            .filter(|p| p.decision != Decision::Skip)
            .collect();
        if changed.is_empty() {
            continue;
        }
        println!("{prefix}{} ({default_branch})", repo.to_string().bold());
        for p in changed {
            let line = match &p.decision {
                Decision::Add { .. } => format!("  +  {}", p.project_name).green(),
                Decision::Update { old_value, .. } => {
                    format!("  ~  {} (was '{old_value}')", p.project_name).yellow()
                }
                Decision::Fail(reason) => format!("  ✗  {}: {reason}", p.project_name).red(),
                Decision::Skip => continue,
            };
            println!("{line}");
        }
    }

    let t = report.totals();
    println!(
        "{prefix}✓ {} organizations | {} targets | {} projects on default branch | {} added, {} updated, {} unchanged, {} failed",
        t.organizations, t.targets, t.matched_projects, t.added, t.updated, t.skipped, t.failed,
    );
}
