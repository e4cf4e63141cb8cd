//! CLI command definitions and argument parsing.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fieldalert_domain::AlertKind;
use std::path::PathBuf;

/// FieldAlert - keep REDCap follow-up alerts in line with dosing and visit data.
#[derive(Debug, Parser)]
#[command(name = "fieldalert")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.fieldalert/config.toml)
    #[arg(short, long, global = true, env = "FIELDALERT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sweep every configured project and reconcile alert flags
    Run(RunArgs),

    /// Show what a sweep would do for one participant
    Check(CheckArgs),

    /// Clear every engine-set alert of one kind
    Purge(PurgeArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Evaluation day (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Decide and report, but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Only sweep this project
    #[arg(short, long)]
    pub project: Option<String>,
}

/// Arguments for the check command.
#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// REDCap record id of the participant
    pub record: String,

    /// Evaluation day (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Project holding the record (default: first configured project)
    #[arg(short, long)]
    pub project: Option<String>,
}

/// Arguments for the purge command.
#[derive(Debug, Parser)]
pub struct PurgeArgs {
    /// Alert kind to clear
    #[arg(short, long, value_enum)]
    pub kind: KindArg,

    /// Only purge this project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Report what would be cleared, but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Alert kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    /// Household (to be visited) alerts
    Household,
    /// Non-compliant visit alerts
    NonCompliant,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<KindArg> for AlertKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Household => AlertKind::HouseholdVisit,
            KindArg::NonCompliant => AlertKind::NonCompliantVisit,
        }
    }
}
