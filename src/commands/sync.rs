use std::sync::Arc;

use anyhow::Result;
use herald_core::{ConfigHandle, Scheduler};
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(config: Arc<ConfigHandle>) -> Result<()> {
    let provider = config
        .current()
        .remote
        .as_ref()
        .map(|r| r.provider.clone())
        .unwrap_or_else(|| "(none)".to_string());

    let scheduler = Scheduler::from_config(config);

    let spinner = tui::create_spinner(format!("Syncing today's events from {}", provider));
    let result = scheduler.sync_tick().await;
    spinner.finish_and_clear();

    println!("Synced today's events from {}", provider.bold());
    match result {
        Ok(stats) => println!("{}", stats.render()),
        Err(e) => {
            println!("   {}", e.to_string().red());
            anyhow::bail!("Sync failed; stored events were left unchanged");
        }
    }

    Ok(())
}
