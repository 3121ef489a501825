mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlmigrate_config::{ConfigLoader, MigrateConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlmigrate", version, about = "Apply SQL migrations exactly once")]
struct Cli {
    /// Path to the config file (YAML or TOML)
    #[arg(short, long, default_value = "sqlmigrate.yml", env = "SQLMIGRATE_CONFIG")]
    config: PathBuf,

    /// Database file, overriding the config
    #[arg(long, env = "SQLMIGRATE_DATABASE")]
    database: Option<PathBuf>,

    /// Migrations directory, overriding the config
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migrations
    Up,
    /// List migrations recorded in the ledger
    Status,
    /// List migrations that have not been applied yet
    Pending,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    match cli.command {
        Command::Up => commands::up(&config),
        Command::Status => commands::status(&config),
        Command::Pending => commands::pending(&config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<MigrateConfig> {
    let mut config = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }
    if let Some(dir) = &cli.dir {
        config.migrations_dir = dir.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
