//! Merge a freshly fetched set of remote events into the event store.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{HeraldError, HeraldResult};
use crate::event::CalendarEvent;
use crate::store::EventStore;

/// Statistics from a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncStats {
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Save every remote event (carrying lifecycle flags forward), then delete
/// stored records whose identifier is absent from `remote_events`.
///
/// A failed save aborts the pass before anything is deleted. Events whose id
/// cannot name a record are skipped. Re-running with the same input is
/// harmless.
pub fn reconcile(store: &EventStore, remote_events: &[CalendarEvent]) -> HeraldResult<SyncStats> {
    let mut stats = SyncStats::default();

    let known_ids = store.ids()?;
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(remote_events.len());

    for event in remote_events {
        match store.save(event) {
            Ok(_) => {}
            Err(HeraldError::InvalidId(id)) => {
                warn!(
                    event_id = %id,
                    description = %event.description,
                    "skipping event with unusable id"
                );
                continue;
            }
            Err(e) => return Err(e),
        }

        if !seen_ids.insert(event.id.clone()) {
            continue;
        }
        if known_ids.contains(&event.id) {
            stats.updated += 1;
        } else {
            debug!(event_id = %event.id, description = %event.description, "new event");
            stats.created += 1;
        }
    }

    stats.deleted = store.delete_not_in(&seen_ids)?.len();

    Ok(stats)
}
