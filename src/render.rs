//! Terminal rendering for herald-core types, colored with owo_colors.

use chrono::{DateTime, Utc};
use herald_core::{Decision, LocalEvent, Notification, SyncStats};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Decision {
    fn render(&self) -> String {
        let label = self.to_string();
        match self {
            Decision::None => label.dimmed().to_string(),
            Decision::AnnounceStart => label.green().to_string(),
            Decision::CheckStarted => label.cyan().to_string(),
            Decision::Remind => label.yellow().to_string(),
            Decision::AnnounceEnd => label.magenta().to_string(),
        }
    }
}

impl Render for Notification {
    fn render(&self) -> String {
        let marker = if self.delivered {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        format!("{} {} {}", marker, self.decision.render(), self.text)
    }
}

impl Render for SyncStats {
    fn render(&self) -> String {
        if self.is_empty() {
            return "   No changes".dimmed().to_string();
        }
        format!(
            "   {} created, {} updated, {} deleted",
            self.created.green(),
            self.updated.yellow(),
            self.deleted.red()
        )
    }
}

fn flag(label: &str, set: bool) -> String {
    if set {
        format!("{} {}", "●".green(), label)
    } else {
        format!("{} {}", "○".dimmed(), label.dimmed())
    }
}

/// Status view of a stored event relative to `now`.
pub fn render_local_event(event: &LocalEvent, now: DateTime<Utc>) -> String {
    let flags = &event.lifecycle;
    let mut line = format!(
        "{}\n      {}  {}  {}",
        event.event.summary_at(now),
        flag("started", flags.start_announced),
        flag("checked", flags.check_start_announced),
        flag("ended", flags.end_announced),
    );

    if let Some(last) = flags.last_time_reminded {
        let zone = event.event.zone();
        let reminded = format!("last reminded {}", zone.clock_time(last));
        line.push_str(&format!("  {}", reminded.dimmed()));
    }

    line
}
