//! On-disk event store.
//!
//! One JSON file per event identifier lives in the events directory. The file
//! holds the fetched [`CalendarEvent`] snapshot together with its [`Lifecycle`]
//! flags, and is the single source of truth for "has this notification already
//! fired".
//!
//! All mutating operations and batch reads run under one store-wide lock.
//! Mutations additionally hold an advisory lock file in the directory, so a
//! second herald process (`herald sync` beside the daemon) never interleaves a
//! read-modify-write with ours. Writes go to a temporary file that is synced and
//! then renamed over the record, so readers (and a process restarted after a
//! crash) only ever see a complete record.
//!
//! Record names are the urlencoded identifier plus `.json`. Identifiers that are
//! empty or whose encoded name would not fit in one path component are refused
//! with [`HeraldError::InvalidId`].

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{HeraldError, HeraldResult};
use crate::event::CalendarEvent;
use crate::local_event::{Lifecycle, LocalEvent};
use crate::lock::{DirLock, REMINDER_LOCK, STORE_LOCK};

const RECORD_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";

/// Longest encoded identifier whose temp file name stays under the usual
/// 255-byte component limit.
const MAX_ENCODED_ID_LEN: usize = 240;

pub struct EventStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl EventStore {
    /// Open a store rooted at `dir`. The directory is created on first write.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        EventStore {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Upsert a fetched event, carrying forward the lifecycle flags of an
    /// existing record with the same identifier.
    pub fn save(&self, event: &CalendarEvent) -> HeraldResult<LocalEvent> {
        self.record_path(&event.id)?;
        let _guard = self.write_guard().map_err(|source| HeraldError::StorageWriteFailed {
            id: event.id.clone(),
            source,
        })?;

        let lifecycle = match self.read_record(&event.id) {
            Ok(existing) => existing.lifecycle,
            Err(HeraldError::NotFound(_)) => Lifecycle::default(),
            Err(HeraldError::Corrupt { id, reason }) => {
                warn!(event_id = %id, %reason, "replacing corrupt event record");
                Lifecycle::default()
            }
            Err(e) => return Err(e),
        };

        let record = LocalEvent {
            event: event.clone(),
            lifecycle,
        };
        self.write_record(&record)?;
        Ok(record)
    }

    /// Load one record by identifier.
    pub fn load(&self, id: &str) -> HeraldResult<LocalEvent> {
        let _guard = self.guard();
        self.read_record(id)
    }

    /// Today's working set: records scheduled for the calendar day of `now` (in
    /// each event's own zone) whose end has not passed.
    ///
    /// Unreadable records are logged and skipped.
    pub fn load_all(&self, now: DateTime<Utc>) -> HeraldResult<Vec<LocalEvent>> {
        let _guard = self.guard();

        let mut events: Vec<LocalEvent> = self
            .stored_ids()?
            .into_iter()
            .filter_map(|id| match self.read_record(&id) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(event_id = %id, error = %e, "skipping unreadable event record");
                    None
                }
            })
            .filter(|record| record.is_scheduled_for_today(now) && !record.has_ended_by(now))
            .collect();

        events.sort_by(|a, b| a.event.start.cmp(&b.event.start));
        Ok(events)
    }

    /// Identifiers of every stored record, readable or not.
    pub fn ids(&self) -> HeraldResult<HashSet<String>> {
        let _guard = self.guard();
        Ok(self.stored_ids()?.into_iter().collect())
    }

    /// Delete every record whose identifier is not in `keep`. Returns the
    /// identifiers that were removed.
    pub fn delete_not_in(&self, keep: &HashSet<String>) -> HeraldResult<Vec<String>> {
        let _guard = self.write_guard()?;

        let mut removed = Vec::new();
        for id in self.stored_ids()? {
            if keep.contains(&id) {
                continue;
            }
            fs::remove_file(self.record_path(&id)?)
                .map_err(|source| HeraldError::StorageWriteFailed {
                    id: id.clone(),
                    source,
                })?;
            debug!(event_id = %id, "removed event no longer in calendar");
            removed.push(id);
        }

        Ok(removed)
    }

    /// Read-modify-write of one record's lifecycle flags.
    pub fn update_flags<F>(&self, id: &str, mutation: F) -> HeraldResult<LocalEvent>
    where
        F: FnOnce(&mut Lifecycle),
    {
        let _guard = self.write_guard().map_err(|source| HeraldError::StorageWriteFailed {
            id: id.to_string(),
            source,
        })?;

        let mut record = self.read_record(id)?;
        mutation(&mut record.lifecycle);
        self.write_record(&record)?;
        Ok(record)
    }

    /// Conditional read-modify-write against the record as it is on disk right
    /// now. `change` sees the fresh record and returns whether it should be
    /// written back; `None` means it declined and nothing was written.
    pub fn transition<F>(&self, id: &str, change: F) -> HeraldResult<Option<LocalEvent>>
    where
        F: FnOnce(&mut LocalEvent) -> bool,
    {
        let _guard = self.write_guard().map_err(|source| HeraldError::StorageWriteFailed {
            id: id.to_string(),
            source,
        })?;

        let mut record = self.read_record(id)?;
        if !change(&mut record) {
            return Ok(None);
        }
        self.write_record(&record)?;
        Ok(Some(record))
    }

    /// Block until no other reminder tick on this directory is running, in
    /// this process or any other. The tick owns the directory until the
    /// returned lock is dropped.
    pub fn lock_reminders(&self) -> HeraldResult<DirLock> {
        Ok(DirLock::acquire(&self.dir, REMINDER_LOCK)?)
    }

    // =========================================================================
    // Unlocked helpers: callers must hold the guard
    // =========================================================================

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> io::Result<WriteGuard<'_>> {
        let local = self.guard();
        let shared = DirLock::acquire(&self.dir, STORE_LOCK)?;
        Ok(WriteGuard {
            _shared: shared,
            _local: local,
        })
    }

    fn record_path(&self, id: &str) -> HeraldResult<PathBuf> {
        let encoded = urlencoding::encode(id);
        if encoded.is_empty() || encoded.len() > MAX_ENCODED_ID_LEN {
            return Err(HeraldError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", encoded, RECORD_EXTENSION)))
    }

    fn stored_ids(&self) -> HeraldResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let ids = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|e| e == RECORD_EXTENSION))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                match urlencoding::decode(stem) {
                    Ok(id) => Some(id.into_owned()),
                    Err(_) => {
                        warn!(path = %path.display(), "ignoring event file with undecodable name");
                        None
                    }
                }
            })
            .collect();

        Ok(ids)
    }

    fn read_record(&self, id: &str) -> HeraldResult<LocalEvent> {
        let content = match fs::read_to_string(self.record_path(id)?) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(HeraldError::NotFound(id.to_string()));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(HeraldError::Corrupt {
                    id: id.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let record: LocalEvent =
            serde_json::from_str(&content).map_err(|e| HeraldError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        if record.id() != id {
            return Err(HeraldError::Corrupt {
                id: id.to_string(),
                reason: format!("record holds event '{}'", record.id()),
            });
        }

        Ok(record)
    }

    fn write_record(&self, record: &LocalEvent) -> HeraldResult<()> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| HeraldError::Serialization(e.to_string()))?;

        let path = self.record_path(record.id())?;
        let mut temp = path.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        write_atomically(&temp, &path, content.as_bytes()).map_err(|source| {
            let _ = fs::remove_file(&temp);
            HeraldError::StorageWriteFailed {
                id: record.id().to_string(),
                source,
            }
        })
    }
}

/// The in-process lock plus the directory's store lock file. The file lock is
/// released first.
struct WriteGuard<'a> {
    _shared: DirLock,
    _local: MutexGuard<'a, ()>,
}

/// Write `data` to `temp`, flush it to disk, then rename it over `path`.
fn write_atomically(temp: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp, path)?;
    sync_parent(path)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => File::open(parent)?.sync_all(),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
