//! Core engine for herald, a voice reminder daemon for today's calendar tasks.
//!
//! - [`store`] keeps one JSON record per event with its notification flags
//! - [`reconcile`] merges each fetch from the [`remote`] provider into the store
//! - [`reminder`] decides which notification is due for an event
//! - [`render`] turns a decision into text and [`speech`] delivers it
//! - [`scheduler`] runs the sync and reminder loops

pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod local_event;
pub mod lock;
pub mod reconcile;
pub mod reminder;
pub mod remote;
pub mod render;
pub mod scheduler;
pub mod speech;
pub mod store;
pub mod utils;

pub use config::{ConfigHandle, HeraldConfig};
pub use date_range::DateRange;
pub use error::{HeraldError, HeraldResult};
pub use event::CalendarEvent;
pub use local_event::{Lifecycle, LocalEvent};
pub use lock::DirLock;
pub use reconcile::SyncStats;
pub use reminder::{Decision, ReminderPolicy};
pub use scheduler::{Notification, Scheduler};
pub use store::EventStore;
