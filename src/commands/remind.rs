use std::sync::Arc;

use anyhow::Result;
use herald_core::{ConfigHandle, Scheduler};
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn run(config: Arc<ConfigHandle>) -> Result<()> {
    let scheduler = Scheduler::from_config(config);
    let fired = scheduler.reminder_tick().await?;

    if fired.is_empty() {
        println!("{}", "Nothing due right now".dimmed());
        return Ok(());
    }

    for notification in &fired {
        println!("{}", notification.render());
    }

    Ok(())
}
