//! Drives the sync and reminder ticks through a whole event, the way the
//! daemon loops would, against a real events directory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use herald_core::remote::CalendarSource;
use herald_core::render::MessageTemplates;
use herald_core::speech::Speaker;
use herald_core::{
    CalendarEvent, ConfigHandle, DateRange, Decision, EventStore, HeraldConfig, HeraldError,
    HeraldResult, Scheduler,
};
use tempfile::TempDir;

struct ScriptedSource {
    events: Mutex<Option<Vec<CalendarEvent>>>,
}

#[async_trait]
impl CalendarSource for ScriptedSource {
    async fn events_between(&self, _range: &DateRange) -> HeraldResult<Vec<CalendarEvent>> {
        self.events
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HeraldError::RemoteFetchFailed("connection refused".into()))
    }
}

#[derive(Default)]
struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> HeraldResult<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 20, h, m, 0).unwrap()
}

fn standup() -> CalendarEvent {
    CalendarEvent {
        id: "standup@example.com".to_string(),
        start: at(14, 0),
        end: Some(at(14, 30)),
        time_zone: "UTC".to_string(),
        description: "Standup".to_string(),
    }
}

struct Harness {
    _tmp: TempDir,
    source: Arc<ScriptedSource>,
    speaker: Arc<RecordingSpeaker>,
    config: Arc<ConfigHandle>,
    scheduler: Scheduler,
}

fn harness(events: Vec<CalendarEvent>) -> Harness {
    let tmp = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource {
        events: Mutex::new(Some(events)),
    });
    let speaker = Arc::new(RecordingSpeaker::default());
    let config = Arc::new(ConfigHandle::fixed(HeraldConfig {
        events_dir: tmp.path().to_path_buf(),
        ..Default::default()
    }));
    let store = Arc::new(EventStore::open(tmp.path()));
    let scheduler = Scheduler::new(store, config.clone(), source.clone(), speaker.clone());

    Harness {
        _tmp: tmp,
        source,
        speaker,
        config,
        scheduler,
    }
}

/// Run sync every 15s and reminders every 30s between `from` and `to`,
/// returning every fired decision in order.
async fn run_between(h: &Harness, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Decision> {
    let mut decisions = Vec::new();
    let mut now = from;
    while now <= to {
        let _ = h.scheduler.sync_tick_at(now).await;
        if (now - from).num_seconds() % 30 == 0 {
            for n in h.scheduler.reminder_tick_at(now).await.unwrap() {
                decisions.push(n.decision);
            }
        }
        now += TimeDelta::seconds(15);
    }
    decisions
}

#[tokio::test]
async fn test_full_event_lifecycle() {
    let h = harness(vec![standup()]);

    let decisions = run_between(&h, at(13, 50), at(14, 45)).await;
    assert_eq!(
        decisions,
        vec![
            Decision::AnnounceStart,
            Decision::CheckStarted,
            Decision::Remind,
            Decision::Remind,
            Decision::AnnounceEnd,
        ]
    );

    let spoken = h.speaker.spoken.lock().unwrap().clone();
    assert_eq!(
        spoken.first().map(String::as_str),
        Some("Hey! Time to tackle \"Standup\"! You have \"Standup\" scheduled for now.")
    );
    assert_eq!(spoken[2], "You have 20 minutes left for Standup");
    assert_eq!(spoken.last().map(String::as_str), Some("Hey! The \"Standup\" is over now!"));
}

#[tokio::test]
async fn test_restart_does_not_repeat_announcements() {
    let h = harness(vec![standup()]);
    run_between(&h, at(14, 0), at(14, 2)).await;

    // A fresh scheduler over the same directory, as after a process restart.
    let store = Arc::new(EventStore::open(h.config.current().events_dir.clone()));
    let restarted = Scheduler::new(store, h.config.clone(), h.source.clone(), h.speaker.clone());
    restarted.sync_tick_at(at(14, 3)).await.unwrap();

    let fired = restarted.reminder_tick_at(at(14, 3)).await.unwrap();
    assert!(fired.is_empty());
}

#[tokio::test]
async fn test_outage_then_removal() {
    let h = harness(vec![standup()]);
    run_between(&h, at(14, 0), at(14, 1)).await;

    *h.source.events.lock().unwrap() = None;
    assert!(h.scheduler.sync_tick_at(at(14, 5)).await.is_err());
    assert!(h.scheduler.store().load("standup@example.com").is_ok());

    *h.source.events.lock().unwrap() = Some(Vec::new());
    let stats = h.scheduler.sync_tick_at(at(14, 6)).await.unwrap();
    assert_eq!(stats.deleted, 1);
    assert!(h.scheduler.reminder_tick_at(at(14, 10)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_template_mid_run_uses_fallback() {
    let h = harness(vec![standup()]);
    run_between(&h, at(14, 0), at(14, 1)).await;

    h.config.replace(HeraldConfig {
        events_dir: h.config.current().events_dir.clone(),
        messages: MessageTemplates {
            remind: Some("Only {{.TimeLeft}} for {{.Evnt}}".to_string()),
            ..Default::default()
        },
        ..Default::default()
    });

    let fired = h.scheduler.reminder_tick_at(at(14, 10)).await.unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].text, "You have 20 minutes left for Standup");
}
