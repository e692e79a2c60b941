mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herald_core::{ConfigHandle, HeraldConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "herald", version)]
#[command(about = "Speak reminders for today's calendar tasks as they start, progress and end")]
struct Cli {
    /// Config file to use instead of ~/.config/herald/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the sync and reminder loops until interrupted (default)
    Run,
    /// Fetch today's events once and update the local store
    Sync,
    /// Show today's events and which notifications have fired
    Status,
    /// Evaluate reminders once and speak whatever is due
    Remind,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config)?;
    init_tracing(cli.verbose || config.current().debug_log_enabled);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(config).await,
        Commands::Sync => commands::sync::run(config).await,
        Commands::Status => commands::status::run(config),
        Commands::Remind => commands::remind::run(config).await,
    }
}

/// Load the config, writing a commented default file on first run.
fn load_config(explicit: Option<PathBuf>) -> Result<Arc<ConfigHandle>> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let path = HeraldConfig::config_path()?;
            if !path.exists() {
                HeraldConfig::create_default_config(&path)?;
            }
            path
        }
    };

    let handle = ConfigHandle::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(Arc::new(handle))
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
