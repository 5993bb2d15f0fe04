//! branch-tagger — tag Snyk projects with their repository's default branch.
//!
//! # Usage
//!
//! ```text
//! branch-tagger run --key <KEY> [--value <VALUE>] --integration-type <TYPE>...
//!                   [--group-id <ID>] [--region <REGION>] [--github-base-url <URL>]
//!                   [--error-log <PATH>] [--dry-run] [--config <PATH>] [--verbose]
//! branch-tagger report <PATH> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{report::ReportArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "branch-tagger",
    version,
    about = "Tag Snyk projects scanned from a repository's default branch",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the tag on every project that tracks its repository's default branch.
    Run(RunArgs),

    /// Summarize an error log written by a previous run.
    Report(ReportArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Report(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
