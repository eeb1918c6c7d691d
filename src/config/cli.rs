use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "job-alert")]
#[command(about = "Watches a job board and e-mails a digest of new matching postings")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults to ./job-alert.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Run a single pass and exit instead of scheduling
    #[arg(long)]
    pub once: bool,

    /// Validate configuration and print a summary without touching the network or store
    #[arg(long)]
    pub dry_run: bool,
}
