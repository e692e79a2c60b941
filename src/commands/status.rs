use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use herald_core::reminder::evaluate;
use herald_core::{ConfigHandle, EventStore};
use owo_colors::OwoColorize;

use crate::render::{Render, render_local_event};

pub fn run(config: Arc<ConfigHandle>) -> Result<()> {
    let current = config.current();
    let store = EventStore::open(current.events_path());
    let now = Utc::now();

    let events = store.load_all(now)?;

    println!("{} {}", "Events in".dimmed(), store.dir().display());

    if events.is_empty() {
        println!("   {}", "Nothing scheduled for the rest of today".dimmed());
        return Ok(());
    }

    let policy = current.policy();
    for event in &events {
        println!("   {}", render_local_event(event, now));

        let due = evaluate(event, now, &policy).decision;
        if !due.is_none() {
            println!("      {} {}", "due now:".dimmed(), due.render());
        }
    }

    Ok(())
}
