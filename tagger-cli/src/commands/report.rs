//! `branch-tagger report` — inspect an error log from a previous run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tagger_sync::{ledger, ErrorRecord, Summary};

/// Arguments for `branch-tagger report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Path to the error log (JSON array).
    pub path: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn run(self) -> Result<()> {
        let records = ledger::load(&self.path)
            .with_context(|| format!("failed to read error log {}", self.path.display()))?;
        let summary = Summary::from_records(&records);

        if self.json {
            print_json(&summary, &records)?;
            return Ok(());
        }

        super::print_summary(&summary);
        if !records.is_empty() {
            print_records(&records);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    total: usize,
    summary: Vec<SummaryEntryJson>,
    records: &'a [ErrorRecord],
}

#[derive(Serialize)]
struct SummaryEntryJson {
    error_type: String,
    count: usize,
}

fn print_json(summary: &Summary, records: &[ErrorRecord]) -> Result<()> {
    let payload = ReportJson {
        total: summary.total(),
        summary: summary
            .iter()
            .map(|(t, count)| SummaryEntryJson {
                error_type: t.to_string(),
                count,
            })
            .collect(),
        records,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize report JSON")?
    );
    Ok(())
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "time")]
    time: String,
    #[tabled(rename = "error type")]
    error_type: String,
    #[tabled(rename = "where")]
    location: String,
    #[tabled(rename = "message")]
    message: String,
}

fn print_records(records: &[ErrorRecord]) {
    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            time: r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            error_type: r.error_type.to_string(),
            location: location(r),
            message: r.message.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Most specific identifier in the record's context.
fn location(record: &ErrorRecord) -> String {
    ["project_name", "target_url", "target_id", "org_name", "group_id"]
        .iter()
        .find_map(|key| record.context.get(*key).cloned())
        .unwrap_or_else(|| "-".to_string())
}
