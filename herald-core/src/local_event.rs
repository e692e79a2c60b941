//! Locally tracked event: the fetched snapshot plus which notifications already fired.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::event::CalendarEvent;

/// Tolerance around the end time inside which the end announcement may fire.
pub const END_WINDOW_SECS: i64 = 60;

/// Which notifications have already fired for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    #[serde(default)]
    pub start_announced: bool,
    #[serde(default)]
    pub check_start_announced: bool,
    #[serde(default)]
    pub end_announced: bool,
    /// `None` means never reminded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_reminded: Option<DateTime<Utc>>,
}

/// One stored record: event snapshot and its lifecycle flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub event: CalendarEvent,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl LocalEvent {
    pub fn new(event: CalendarEvent) -> Self {
        LocalEvent {
            event,
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.event.id
    }

    pub fn is_scheduled_for_today(&self, now: DateTime<Utc>) -> bool {
        self.event.is_scheduled_for(now)
    }

    /// `now` lies in `[start, end)`; events without an end run from their start onward.
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.event.start && self.event.end.is_none_or(|end| now < end)
    }

    /// `now` lies within one minute before or after the end time.
    pub fn is_near_end(&self, now: DateTime<Utc>) -> bool {
        let Some(end) = self.event.end else {
            return false;
        };
        let window = TimeDelta::seconds(END_WINDOW_SECS);
        now >= end - window && now <= end + window
    }

    pub fn has_ended_by(&self, now: DateTime<Utc>) -> bool {
        self.event.end.is_some_and(|end| now > end)
    }

    /// Spacing between progress reminders: duration split into `repeats` parts.
    ///
    /// `None` when the event has no end, a non-positive duration, or `repeats` is
    /// not positive.
    pub fn reminder_interval(&self, repeats: i64) -> Option<TimeDelta> {
        let duration = self.event.duration()?;
        if duration <= TimeDelta::zero() || repeats <= 0 {
            return None;
        }
        let repeats = i32::try_from(repeats).ok()?;
        Some(duration / repeats)
    }
}
