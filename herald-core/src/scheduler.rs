//! Background loops driving sync and reminders.
//!
//! Two tokio tasks share one [`Scheduler`]: one fetches today's events and
//! reconciles them into the store, the other evaluates every stored event and
//! speaks whatever is due. Each loop sleeps its configured interval *after* a
//! tick finishes, so a slow provider or speech program delays the next tick
//! rather than stacking them up.
//!
//! A reminder tick holds the events directory's reminder lock for its whole
//! duration, speech included. The lock is a file lock, so a manual
//! `herald remind` in another process waits for the daemon's tick instead of
//! interleaving with it. Each due notification is also re-evaluated against the
//! record as it is on disk before its flag is written, and is dropped if the
//! fresh decision differs from the one the tick started with.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ConfigHandle;
use crate::date_range::DateRange;
use crate::error::{HeraldError, HeraldResult};
use crate::lock::DirLock;
use crate::reconcile::{SyncStats, reconcile};
use crate::reminder::{Decision, evaluate};
use crate::remote::{CalendarSource, ConfiguredSource};
use crate::render::{MessageFields, MessageKind, render_message};
use crate::speech::{ConfiguredSpeaker, Speaker};
use crate::store::EventStore;

/// One notification fired during a reminder tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event_id: String,
    pub decision: Decision,
    pub text: String,
    /// Whether the speaker reported success.
    pub delivered: bool,
}

pub struct Scheduler {
    store: Arc<EventStore>,
    config: Arc<ConfigHandle>,
    source: Arc<dyn CalendarSource>,
    speaker: Arc<dyn Speaker>,
    reminding: Mutex<()>,
}

/// Join handles for the two loops started by [`Scheduler::spawn`].
pub struct SchedulerHandles {
    pub sync: JoinHandle<()>,
    pub reminders: JoinHandle<()>,
}

impl SchedulerHandles {
    pub fn abort(&self) {
        self.sync.abort();
        self.reminders.abort();
    }
}

impl Scheduler {
    pub fn new(
        store: Arc<EventStore>,
        config: Arc<ConfigHandle>,
        source: Arc<dyn CalendarSource>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        Scheduler {
            store,
            config,
            source,
            speaker,
            reminding: Mutex::new(()),
        }
    }

    /// Production wiring: store at the configured events directory, the
    /// configured provider and the configured speech command.
    pub fn from_config(config: Arc<ConfigHandle>) -> Self {
        let store = Arc::new(EventStore::open(config.current().events_path()));
        let source = Arc::new(ConfiguredSource::new(config.clone()));
        let speaker = Arc::new(ConfiguredSpeaker::new(config.clone()));
        Scheduler::new(store, config, source, speaker)
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub async fn sync_tick(&self) -> HeraldResult<SyncStats> {
        self.sync_tick_at(Utc::now()).await
    }

    /// Fetch today's events and reconcile them into the store.
    ///
    /// A failed fetch returns the error without touching the store, so stored
    /// flags survive a provider outage.
    pub async fn sync_tick_at(&self, now: DateTime<Utc>) -> HeraldResult<SyncStats> {
        self.config.reload();

        let range = DateRange::today(now);
        let events = self.source.events_between(&range).await?;
        debug!(count = events.len(), from = %range.from, to = %range.to, "fetched events");

        let stats = reconcile(&self.store, &events)?;
        if stats.is_empty() {
            debug!("sync: no changes");
        } else {
            info!(
                created = stats.created,
                updated = stats.updated,
                deleted = stats.deleted,
                "sync complete"
            );
        }
        Ok(stats)
    }

    pub async fn reminder_tick(&self) -> HeraldResult<Vec<Notification>> {
        self.reminder_tick_at(Utc::now()).await
    }

    /// Evaluate every stored event for `now` and deliver what is due.
    ///
    /// Flags are persisted before speaking. When persisting fails the
    /// notification is not spoken and the next tick tries again; when
    /// speaking fails the flag stays set.
    pub async fn reminder_tick_at(&self, now: DateTime<Utc>) -> HeraldResult<Vec<Notification>> {
        let _guard = self.reminding.lock().await;
        let _shared = self.lock_reminders().await?;

        let config = self.config.reload();
        let policy = config.policy();
        let events = self.store.load_all(now)?;

        let mut fired = Vec::new();
        for local in events {
            let decision = evaluate(&local, now, &policy).decision;
            let Some(kind) = MessageKind::from_decision(decision) else {
                continue;
            };

            let transition = self.store.transition(local.id(), |record| {
                let fresh = evaluate(record, now, &policy);
                match fresh.update {
                    Some(update) if fresh.decision == decision => {
                        update.apply(&mut record.lifecycle);
                        true
                    }
                    _ => false,
                }
            });
            let record = match transition {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(event_id = %local.id(), %decision, "already handled, skipping");
                    continue;
                }
                Err(e) => {
                    error!(
                        event_id = %local.id(),
                        %decision,
                        error = %e,
                        "failed to record notification, not speaking"
                    );
                    continue;
                }
            };

            let fields = MessageFields::for_event(&record.event, now);
            let text = render_message(kind, &fields, &config.messages);
            info!(event_id = %record.id(), %decision, text = %text, "notifying");

            let delivered = match self.speaker.speak(&text).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        event_id = %record.id(),
                        %decision,
                        error = %e,
                        "failed to speak notification"
                    );
                    false
                }
            };

            fired.push(Notification {
                event_id: record.id().to_string(),
                decision,
                text,
                delivered,
            });
        }

        Ok(fired)
    }

    async fn lock_reminders(&self) -> HeraldResult<DirLock> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.lock_reminders())
            .await
            .map_err(|e| HeraldError::Io(std::io::Error::other(e)))?
    }

    /// Speak the configured greeting, if any.
    pub async fn greet(&self) {
        let config = self.config.current();
        let Some(greeting) = config.messages.greeting() else {
            return;
        };
        if let Err(e) = self.speaker.speak(greeting).await {
            warn!(error = %e, "failed to speak greeting");
        }
    }

    /// Start the sync and reminder loops. They run until aborted.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandles {
        let scheduler = self.clone();
        let sync = tokio::spawn(async move {
            info!("sync loop started");
            loop {
                if let Err(e) = scheduler.sync_tick().await {
                    warn!(error = %e, "sync failed, keeping stored events");
                }
                tokio::time::sleep(scheduler.config.current().sync_period()).await;
            }
        });

        let scheduler = self;
        let reminders = tokio::spawn(async move {
            info!("reminder loop started");
            loop {
                if let Err(e) = scheduler.reminder_tick().await {
                    error!(error = %e, "reminder tick failed");
                }
                tokio::time::sleep(scheduler.config.current().reminder_period()).await;
            }
        });

        SchedulerHandles { sync, reminders }
    }
}
