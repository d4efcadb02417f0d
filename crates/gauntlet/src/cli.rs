//! Command line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gauntlet_core::Category;

/// Gauntlet: an S3 compatibility test runner.
#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run selected tests against a backend.
    Run(RunArgs),
    /// List registered tests without executing them.
    List(ListArgs),
    /// Print version information.
    Version,
}

/// Test selection flags shared by `run` and `list`.
#[derive(Args, Debug, Default)]
pub struct SelectArgs {
    /// Only tests in these categories (repeatable).
    #[arg(short = 'g', long = "category", value_parser = parse_category)]
    pub categories: Vec<Category>,

    /// Only these exact test ids (repeatable).
    #[arg(short = 't', long = "test")]
    pub tests: Vec<String>,

    /// Only tests whose id starts with this prefix.
    #[arg(long)]
    pub prefix: Option<String>,
}

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Selection flags.
    #[command(flatten)]
    pub select: SelectArgs,

    /// Maximum tests running concurrently (overrides config).
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Per-test timeout in seconds (overrides config).
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Endpoint URL (overrides config).
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Access key (overrides config and environment).
    #[arg(long)]
    pub access_key: Option<String>,

    /// Secret key (overrides config and environment).
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Write a machine-readable JSON report to this path.
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Output format for the summary on stdout.
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Selection flags.
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output format.
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for CLI commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse()
}
