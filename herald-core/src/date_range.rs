//! Date range for fetching events.

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

/// Half-open time window `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// The local calendar day containing `now`.
    pub fn today(now: DateTime<Utc>) -> Self {
        Self::day_in(&Local, now)
    }

    /// The calendar day containing `now` as seen in `tz`.
    pub fn day_in<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> Self {
        let date = now.with_timezone(tz).date_naive();
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);

        DateRange {
            from: start_of_day(tz, date),
            to: start_of_day(tz, next),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }

    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }
}

/// First instant of `date` in `tz`. Falls back to UTC midnight when the zone
/// skips midnight entirely (DST gap at 00:00).
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
