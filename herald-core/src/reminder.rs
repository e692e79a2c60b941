//! Reminder decisions.
//!
//! [`evaluate`] is a pure function of an event's stored state, the current
//! instant and the [`ReminderPolicy`]. It returns at most one notification to
//! fire plus the flag update to persist for it. Conditions are checked in a
//! fixed priority order and the first match wins, so one tick never produces
//! two interruptions for the same event:
//!
//! 1. start announcement
//! 2. "did you start?" check, one minute after start
//! 3. progress reminder, every `duration / notification_repeats`
//! 4. end announcement, within a minute of the end

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::local_event::{Lifecycle, LocalEvent};

pub const DEFAULT_NOTIFICATION_REPEATS: i64 = 3;

/// Delay after start before the start check fires.
pub const CHECK_START_DELAY_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    None,
    AnnounceStart,
    CheckStarted,
    Remind,
    AnnounceEnd,
}

impl Decision {
    pub fn is_none(&self) -> bool {
        matches!(self, Decision::None)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::None => "none",
            Decision::AnnounceStart => "announce_start",
            Decision::CheckStarted => "check_started",
            Decision::Remind => "remind",
            Decision::AnnounceEnd => "announce_end",
        };
        write!(f, "{}", name)
    }
}

/// Flag change that accompanies a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagUpdate {
    /// Start announced; the reminder clock restarts at `reminded_at`.
    StartAnnounced { reminded_at: DateTime<Utc> },
    CheckStartAnnounced,
    Reminded { at: DateTime<Utc> },
    EndAnnounced,
}

impl FlagUpdate {
    pub fn apply(&self, lifecycle: &mut Lifecycle) {
        match *self {
            FlagUpdate::StartAnnounced { reminded_at } => {
                lifecycle.start_announced = true;
                lifecycle.last_time_reminded = Some(reminded_at);
            }
            FlagUpdate::CheckStartAnnounced => lifecycle.check_start_announced = true,
            FlagUpdate::Reminded { at } => lifecycle.last_time_reminded = Some(at),
            FlagUpdate::EndAnnounced => lifecycle.end_announced = true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub update: Option<FlagUpdate>,
}

impl Evaluation {
    fn none() -> Self {
        Evaluation {
            decision: Decision::None,
            update: None,
        }
    }

    fn fire(decision: Decision, update: FlagUpdate) -> Self {
        Evaluation {
            decision,
            update: Some(update),
        }
    }
}

/// Configuration the decision logic depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub notification_repeats: i64,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        ReminderPolicy {
            notification_repeats: DEFAULT_NOTIFICATION_REPEATS,
        }
    }
}

impl ReminderPolicy {
    /// Configured repeat count, or the default when it is not positive.
    pub fn effective_repeats(&self) -> i64 {
        if self.notification_repeats > 0 {
            self.notification_repeats
        } else {
            DEFAULT_NOTIFICATION_REPEATS
        }
    }
}

/// Decide which notification, if any, fires for `event` at `now`.
pub fn evaluate(event: &LocalEvent, now: DateTime<Utc>, policy: &ReminderPolicy) -> Evaluation {
    let flags = &event.lifecycle;
    let today = event.is_scheduled_for_today(now);

    if !flags.start_announced && today && event.is_running_at(now) {
        return Evaluation::fire(
            Decision::AnnounceStart,
            FlagUpdate::StartAnnounced { reminded_at: now },
        );
    }

    if today
        && flags.start_announced
        && !flags.check_start_announced
        && now >= event.event.start + TimeDelta::seconds(CHECK_START_DELAY_SECS)
    {
        return Evaluation::fire(Decision::CheckStarted, FlagUpdate::CheckStartAnnounced);
    }

    if should_remind(event, now, policy) {
        return Evaluation::fire(Decision::Remind, FlagUpdate::Reminded { at: now });
    }

    if !flags.end_announced && today && event.is_near_end(now) {
        return Evaluation::fire(Decision::AnnounceEnd, FlagUpdate::EndAnnounced);
    }

    Evaluation::none()
}

fn should_remind(event: &LocalEvent, now: DateTime<Utc>, policy: &ReminderPolicy) -> bool {
    if event.lifecycle.end_announced {
        return false;
    }
    let Some(end) = event.event.end else {
        return false;
    };
    // Also rejects zero-length and inverted events.
    let Some(interval) = event.reminder_interval(policy.effective_repeats()) else {
        return false;
    };
    if now < event.event.start || now > end {
        return false;
    }

    match event.lifecycle.last_time_reminded {
        None => true,
        Some(last) => now >= last + interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CalendarEvent;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, h, m, 0).unwrap()
    }

    fn at_s(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, h, m, s).unwrap()
    }

    fn make_local(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> LocalEvent {
        LocalEvent::new(CalendarEvent {
            id: "evt".to_string(),
            start,
            end,
            time_zone: "UTC".to_string(),
            description: "Focus block".to_string(),
        })
    }

    fn decide(event: &LocalEvent, now: DateTime<Utc>) -> Decision {
        evaluate(event, now, &ReminderPolicy::default()).decision
    }

    /// Evaluate and apply the update, as one reminder tick would.
    fn tick(event: &mut LocalEvent, now: DateTime<Utc>) -> Decision {
        let evaluation = evaluate(event, now, &ReminderPolicy::default());
        if let Some(update) = evaluation.update {
            update.apply(&mut event.lifecycle);
        }
        evaluation.decision
    }

    #[test]
    fn test_nothing_before_start() {
        let event = make_local(at(14, 0), Some(at(14, 30)));
        assert_eq!(decide(&event, at(13, 59)), Decision::None);
    }

    #[test]
    fn test_announce_start_window() {
        let event = make_local(at(14, 0), Some(at(14, 30)));
        assert_eq!(decide(&event, at(14, 0)), Decision::AnnounceStart);
        assert_eq!(decide(&event, at_s(14, 29, 59)), Decision::AnnounceStart);
        assert_ne!(decide(&event, at(14, 30)), Decision::AnnounceStart);
    }

    #[test]
    fn test_announce_start_resets_reminder_clock() {
        let event = make_local(at(14, 0), Some(at(14, 30)));
        let evaluation = evaluate(&event, at(14, 5), &ReminderPolicy::default());
        assert_eq!(
            evaluation.update,
            Some(FlagUpdate::StartAnnounced {
                reminded_at: at(14, 5)
            })
        );
    }

    #[test]
    fn test_no_start_announcement_for_other_day() {
        let event = make_local(
            Utc.with_ymd_and_hms(2025, 3, 19, 14, 0, 0).unwrap(),
            Some(at(14, 30)),
        );
        // Running (spans midnight) but did not start today.
        assert_ne!(decide(&event, at(9, 0)), Decision::AnnounceStart);
    }

    #[test]
    fn test_check_started_after_one_minute() {
        let mut event = make_local(at(9, 0), Some(at(10, 0)));
        assert_eq!(tick(&mut event, at(9, 0)), Decision::AnnounceStart);
        assert_eq!(tick(&mut event, at_s(9, 0, 30)), Decision::None);
        assert_eq!(tick(&mut event, at(9, 1)), Decision::CheckStarted);
        assert!(event.lifecycle.check_start_announced);
        assert_eq!(tick(&mut event, at(9, 2)), Decision::None);
    }

    #[test]
    fn test_check_started_requires_start_announced() {
        let mut event = make_local(at(9, 0), Some(at(10, 0)));
        event.lifecycle.last_time_reminded = Some(at(9, 5));
        // Not yet announced: start announcement wins, never the check.
        assert_eq!(decide(&event, at(9, 5)), Decision::AnnounceStart);
    }

    #[test]
    fn test_reminder_schedule_for_one_hour_event() {
        let mut event = make_local(at(10, 0), Some(at(11, 0)));

        assert_eq!(tick(&mut event, at(10, 0)), Decision::AnnounceStart);
        assert_eq!(tick(&mut event, at(10, 1)), Decision::CheckStarted);
        assert_eq!(tick(&mut event, at(10, 19)), Decision::None);
        assert_eq!(tick(&mut event, at(10, 20)), Decision::Remind);
        assert_eq!(tick(&mut event, at(10, 30)), Decision::None);
        assert_eq!(tick(&mut event, at(10, 40)), Decision::Remind);
        assert_eq!(event.lifecycle.last_time_reminded, Some(at(10, 40)));
    }

    #[test]
    fn test_first_reminder_is_immediate_when_never_reminded() {
        let mut event = make_local(at(10, 0), Some(at(11, 0)));
        event.lifecycle.start_announced = true;
        event.lifecycle.check_start_announced = true;
        assert_eq!(decide(&event, at(10, 0)), Decision::Remind);
    }

    #[test]
    fn test_non_positive_repeats_use_default() {
        let mut event = make_local(at(10, 0), Some(at(11, 0)));
        event.lifecycle.start_announced = true;
        event.lifecycle.check_start_announced = true;
        event.lifecycle.last_time_reminded = Some(at(10, 0));

        let policy = ReminderPolicy {
            notification_repeats: 0,
        };
        assert_eq!(evaluate(&event, at(10, 19), &policy).decision, Decision::None);
        assert_eq!(evaluate(&event, at(10, 20), &policy).decision, Decision::Remind);

        let policy = ReminderPolicy {
            notification_repeats: 6,
        };
        assert_eq!(evaluate(&event, at(10, 10), &policy).decision, Decision::Remind);
    }

    #[test]
    fn test_announce_end_window() {
        let mut event = make_local(at(14, 0), Some(at(14, 30)));
        event.lifecycle.start_announced = true;
        event.lifecycle.check_start_announced = true;
        // Reminded recently enough that no reminder is due at the end.
        event.lifecycle.last_time_reminded = Some(at(14, 25));

        assert_eq!(decide(&event, at(14, 28)), Decision::None);
        assert_eq!(decide(&event, at(14, 29)), Decision::AnnounceEnd);
        assert_eq!(decide(&event, at(14, 31)), Decision::AnnounceEnd);
        assert_eq!(decide(&event, at_s(14, 31, 1)), Decision::None);
    }

    #[test]
    fn test_end_announced_only_once() {
        let mut event = make_local(at(14, 0), Some(at(14, 30)));
        event.lifecycle.start_announced = true;
        event.lifecycle.check_start_announced = true;
        event.lifecycle.last_time_reminded = Some(at(14, 25));

        assert_eq!(tick(&mut event, at(14, 29)), Decision::AnnounceEnd);
        assert_eq!(tick(&mut event, at_s(14, 29, 30)), Decision::None);
        // No reminders after the end announcement either.
        assert_eq!(tick(&mut event, at(14, 30)), Decision::None);
    }

    #[test]
    fn test_reminder_takes_priority_over_end() {
        let mut event = make_local(at(14, 0), Some(at(14, 30)));
        event.lifecycle.start_announced = true;
        event.lifecycle.check_start_announced = true;
        event.lifecycle.last_time_reminded = Some(at(14, 19));

        assert_eq!(tick(&mut event, at(14, 29)), Decision::Remind);
        assert_eq!(tick(&mut event, at_s(14, 29, 30)), Decision::AnnounceEnd);
    }

    #[test]
    fn test_event_without_end_only_announces_start_and_check() {
        let mut event = make_local(at(9, 0), None);
        let mut fired = Vec::new();
        for minute in 0..60 {
            let decision = tick(&mut event, at(9, minute));
            if !decision.is_none() {
                fired.push(decision);
            }
        }
        assert_eq!(fired, vec![Decision::AnnounceStart, Decision::CheckStarted]);
    }

    #[test]
    fn test_zero_duration_event_never_reminds() {
        let mut event = make_local(at(9, 0), Some(at(9, 0)));
        event.lifecycle.start_announced = true;
        event.lifecycle.check_start_announced = true;
        assert_ne!(decide(&event, at(9, 0)), Decision::Remind);

        let mut inverted = make_local(at(9, 0), Some(at(8, 0)));
        inverted.lifecycle.start_announced = true;
        inverted.lifecycle.check_start_announced = true;
        assert_ne!(decide(&inverted, at(9, 0)), Decision::Remind);
    }

    #[test]
    fn test_at_most_one_decision_per_tick_over_a_day() {
        let mut event = make_local(at(14, 0), Some(at(14, 30)));
        let mut counts = std::collections::HashMap::new();

        // Every 30 seconds across the event, applying updates as the loop would.
        for step in 0..(2 * 60) {
            let now = at(13, 45) + TimeDelta::seconds(30 * step);
            let decision = tick(&mut event, now);
            *counts.entry(decision).or_insert(0) += 1;
        }

        assert_eq!(counts.get(&Decision::AnnounceStart), Some(&1));
        assert_eq!(counts.get(&Decision::CheckStarted), Some(&1));
        assert_eq!(counts.get(&Decision::AnnounceEnd), Some(&1));
        assert_eq!(counts.get(&Decision::Remind), Some(&2));
    }
}
