//! Advisory file locks shared by every herald process using one events
//! directory.
//!
//! Locks are `flock`-style and belong to the open file, so two handles in the
//! same process exclude each other just like two processes do. Dropping the
//! [`DirLock`] releases it.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

/// Held around every store mutation.
pub const STORE_LOCK: &str = ".store.lock";

/// Held for a whole reminder tick, speech included.
pub const REMINDER_LOCK: &str = ".reminders.lock";

/// Held by a running daemon for its lifetime.
pub const DAEMON_LOCK: &str = ".daemon.lock";

#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Block until the exclusive lock on `dir/name` is ours.
    pub fn acquire(dir: &Path, name: &str) -> io::Result<DirLock> {
        let file = open_lock_file(dir, name)?;
        file.lock_exclusive()?;
        Ok(DirLock { _file: file })
    }

    /// Take the lock if nobody holds it, `None` otherwise.
    pub fn try_acquire(dir: &Path, name: &str) -> io::Result<Option<DirLock>> {
        let file = open_lock_file(dir, name)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(DirLock { _file: file })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn open_lock_file(dir: &Path, name: &str) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(dir.join(name))
}
