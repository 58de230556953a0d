//! # ct-cli
//!
//! Command-line interface for the Commitment Tracker enrichment job.
//!
//! - `ct run` — one enrichment pass over every goal; prints the JSON report
//! - `ct goal list/show` — inspect goal records (read-only)

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ct_enrich::TrackerConfig;
use tracing_subscriber::EnvFilter;

/// Commitment Tracker — daily motivational messages for goals.
#[derive(Parser)]
#[command(name = "ct", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Goal store directory (defaults to <project-root>/.ct/goals).
    #[arg(long)]
    goals_dir: Option<PathBuf>,

    /// Enrichment config file (defaults to <project-root>/.ct/enrich.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one enrichment pass and print the result as JSON.
    Run,
    /// Inspect goal records.
    Goal {
        #[command(subcommand)]
        command: commands::goal::GoalCommands,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let mut config = TrackerConfig::for_project(&project_root);
    if let Some(goals_dir) = cli.goals_dir {
        config.goals_dir = goals_dir;
    }
    if let Some(path) = cli.config {
        config.enrich_config = path;
    }

    match &cli.command {
        Commands::Run => commands::run::execute(&config),
        Commands::Goal { command } => commands::goal::execute(command, &config),
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("ct_enrich=info".parse()?)
        .add_directive("ct_goal=info".parse()?)
        .add_directive("ct=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
