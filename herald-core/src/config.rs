//! herald configuration.
//!
//! Settings are layered with the `config` crate: the TOML file at
//! `~/.config/herald/config.toml` (or `--config`), then `HERALD_*`
//! environment variables with `__` between nested keys, e.g.
//! `HERALD_REMOTE__PASSWORD`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::{HeraldError, HeraldResult};
use crate::reminder::{DEFAULT_NOTIFICATION_REPEATS, ReminderPolicy};
use crate::remote::RemoteConfig;
use crate::render::MessageTemplates;
use crate::speech::SpeechConfig;

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_EVENTS_DIR: &str = "~/.local/share/herald/events";

fn default_events_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("herald").join("events"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EVENTS_DIR))
}

fn default_notification_repeats() -> i64 {
    DEFAULT_NOTIFICATION_REPEATS
}

fn default_sync_interval() -> Duration {
    DEFAULT_SYNC_INTERVAL
}

fn default_reminder_interval() -> Duration {
    DEFAULT_REMINDER_INTERVAL
}

/// Accepts human durations (`"15s"`, `"1m 30s"`) or plain seconds.
fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub debug_log_enabled: bool,

    #[serde(default = "default_events_dir")]
    pub events_dir: PathBuf,

    /// Progress reminders per event. Non-positive values use the default.
    #[serde(default = "default_notification_repeats")]
    pub notification_repeats: i64,

    #[serde(default = "default_sync_interval", deserialize_with = "deserialize_interval")]
    pub sync_interval: Duration,

    #[serde(default = "default_reminder_interval", deserialize_with = "deserialize_interval")]
    pub reminder_interval: Duration,

    #[serde(default)]
    pub messages: MessageTemplates,

    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    /// Unset means notifications only go to the log.
    #[serde(default)]
    pub speech: Option<SpeechConfig>,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        HeraldConfig {
            debug_log_enabled: false,
            events_dir: default_events_dir(),
            notification_repeats: DEFAULT_NOTIFICATION_REPEATS,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
            messages: MessageTemplates::default(),
            remote: None,
            speech: None,
        }
    }
}

impl HeraldConfig {
    /// Default location: `~/.config/herald/config.toml`.
    pub fn config_path() -> HeraldResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HeraldError::Config("Could not determine config directory".into()))?
            .join("herald");

        Ok(config_dir.join("config.toml"))
    }

    /// Read the file at `path` (missing is fine) overlaid with `HERALD_*` variables.
    pub fn read(path: &Path) -> HeraldResult<Self> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("HERALD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| HeraldError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| HeraldError::Config(e.to_string()))
    }

    /// Events directory with `~` expanded.
    pub fn events_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.events_dir.to_string_lossy()).into_owned();
        PathBuf::from(expanded)
    }

    pub fn sync_period(&self) -> Duration {
        non_zero_or(self.sync_interval, DEFAULT_SYNC_INTERVAL)
    }

    pub fn reminder_period(&self) -> Duration {
        non_zero_or(self.reminder_interval, DEFAULT_REMINDER_INTERVAL)
    }

    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            notification_repeats: self.notification_repeats,
        }
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> HeraldResult<()> {
        let contents = format!(
            "\
# herald configuration

# Where event records are kept:
# events_dir = \"{}\"

# Progress reminders per event (the event length is split evenly):
# notification_repeats = {}

# How often to fetch today's events and check for due notifications:
# sync_interval = \"{}\"
# reminder_interval = \"{}\"

# debug_log_enabled = false

# [messages]
# announce_start = 'Hey! Time to tackle \"{{{{.Event}}}}\"! You have \"{{{{.Event}}}}\" scheduled for now.'
# check_start = 'Have you started \"{{{{.Event}}}}\" yet?'
# remind = \"You have {{{{.TimeLeft}}}} left for {{{{.Event}}}}\"
# announce_end = 'Hey! The \"{{{{.Event}}}}\" is over now!'
# greeting = \"Hello, I'm ready to help you.\"

# [remote]
# provider = \"caldav\"
# url = \"https://caldav.example.com/calendars/me/tasks/\"
# username = \"me\"
# Set the password with HERALD_REMOTE__PASSWORD.

# [speech]
# command = \"espeak\"
# args = [\"-s\", \"150\"]
",
            DEFAULT_EVENTS_DIR,
            DEFAULT_NOTIFICATION_REPEATS,
            humantime::format_duration(DEFAULT_SYNC_INTERVAL),
            humantime::format_duration(DEFAULT_REMINDER_INTERVAL),
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HeraldError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| HeraldError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn non_zero_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

/// Shared, reloadable view of the configuration.
///
/// Ticks call [`ConfigHandle::reload`] before reading so edits to the file
/// apply without a restart. `events_dir` is only read at startup.
#[derive(Debug)]
pub struct ConfigHandle {
    path: Option<PathBuf>,
    current: RwLock<Arc<HeraldConfig>>,
}

impl ConfigHandle {
    /// Load from `path`; failure here is fatal to the caller.
    pub fn load(path: impl Into<PathBuf>) -> HeraldResult<Self> {
        let path = path.into();
        let config = HeraldConfig::read(&path)?;
        Ok(ConfigHandle {
            path: Some(path),
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// A handle that never reloads.
    pub fn fixed(config: HeraldConfig) -> Self {
        ConfigHandle {
            path: None,
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Arc<HeraldConfig> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the sources. On failure the previous configuration stays active.
    pub fn reload(&self) -> Arc<HeraldConfig> {
        let Some(path) = &self.path else {
            return self.current();
        };

        match HeraldConfig::read(path) {
            Ok(config) => {
                let config = Arc::new(config);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) = config.clone();
                config
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to reload config, keeping previous"
                );
                self.current()
            }
        }
    }

    /// Replace the active configuration directly.
    pub fn replace(&self, config: HeraldConfig) {
        debug!("config replaced");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }
}
