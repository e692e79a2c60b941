use std::sync::Arc;

use anyhow::{Context, Result};
use herald_core::lock::DAEMON_LOCK;
use herald_core::{ConfigHandle, DirLock, Scheduler};
use owo_colors::OwoColorize;
use tracing::info;

pub async fn run(config: Arc<ConfigHandle>) -> Result<()> {
    let current = config.current();
    if current.remote.is_none() {
        println!(
            "{}",
            "No [remote] provider configured; reminders will only cover events already stored."
                .yellow()
        );
    }

    let events_dir = current.events_path();
    let _daemon = DirLock::try_acquire(&events_dir, DAEMON_LOCK)
        .context("Failed to create daemon lock file")?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Another herald daemon is already running for {}.\n\
                 Stop it first, or use `herald remind` for a one-off tick.",
                events_dir.display()
            )
        })?;

    info!(
        events_dir = %events_dir.display(),
        sync_interval = ?current.sync_period(),
        reminder_interval = ?current.reminder_period(),
        "herald starting"
    );

    let scheduler = Arc::new(Scheduler::from_config(config));
    scheduler.greet().await;

    let handles = scheduler.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("shutting down");
    handles.abort();

    Ok(())
}
