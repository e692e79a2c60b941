//! Calendar events as delivered by a provider.
//!
//! A [`CalendarEvent`] is an immutable snapshot of one task for one fetch.
//! Providers convert their calendar data into this type; everything downstream
//! (store, reminders, rendering) works exclusively with it.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::format_duration;

/// A time-boxed task from the remote calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Stable identifier (calendar UID), also the storage key.
    pub id: String,
    pub start: DateTime<Utc>,
    /// `None` means the event has no defined end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// IANA zone name; empty means the system local zone.
    #[serde(default)]
    pub time_zone: String,
    pub description: String,
}

/// The zone an event's times are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventZone {
    Named(Tz),
    Local,
}

impl EventZone {
    /// Calendar date of `instant` as seen in this zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            EventZone::Named(tz) => instant.with_timezone(tz).date_naive(),
            EventZone::Local => instant.with_timezone(&Local).date_naive(),
        }
    }

    /// Wall-clock time of `instant` in this zone, e.g. `3:04 PM`.
    pub fn clock_time(&self, instant: DateTime<Utc>) -> String {
        const CLOCK: &str = "%-I:%M %p";
        match self {
            EventZone::Named(tz) => instant.with_timezone(tz).format(CLOCK).to_string(),
            EventZone::Local => instant.with_timezone(&Local).format(CLOCK).to_string(),
        }
    }
}

impl CalendarEvent {
    /// Resolve the event's zone, falling back to the local zone when the
    /// identifier is empty or unknown.
    pub fn zone(&self) -> EventZone {
        if self.time_zone.is_empty() {
            return EventZone::Local;
        }

        match self.time_zone.parse::<Tz>() {
            Ok(tz) => EventZone::Named(tz),
            Err(e) => {
                warn!(
                    event_id = %self.id,
                    time_zone = %self.time_zone,
                    error = %e,
                    "unknown time zone, using local time zone"
                );
                EventZone::Local
            }
        }
    }

    /// Whether the event starts on the same calendar day as `now`, in the event's zone.
    pub fn is_scheduled_for(&self, now: DateTime<Utc>) -> bool {
        let zone = self.zone();
        zone.date_of(self.start) == zone.date_of(now)
    }

    /// Length of the event, if it has an end.
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end.map(|end| end - self.start)
    }

    /// Spoken/printed one-line description of the event relative to `now`.
    pub fn summary_at(&self, now: DateTime<Utc>) -> String {
        let zone = self.zone();

        let Some(end) = self.end else {
            return format!(
                "Task \"{}\" is scheduled for whole day, today at {}",
                self.description,
                zone.clock_time(self.start)
            );
        };

        let is_or_was = if end < now { "was" } else { "is" };

        format!(
            "Task \"{}\" {} scheduled for today for {}, from {} to {}",
            self.description,
            is_or_was,
            format_duration(end - self.start),
            zone.clock_time(self.start),
            zone.clock_time(end)
        )
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}
