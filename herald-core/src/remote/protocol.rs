//! Defines the JSON protocol used between herald and provider binaries
//! over stdin/stdout.
//!
//! herald writes one request line:
//!
//! ```json
//! {"command":"list_events","params":{"url":"...","from":"2025-03-20T00:00:00+01:00","to":"..."}}
//! ```
//!
//! and reads one response document, either
//! `{"status":"success","data":[...]}` or `{"status":"error","error":"..."}`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::CalendarEvent;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListEvents,
}

/// Request sent from herald to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from a provider to herald.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

/// List events within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    /// Provider-specific config (e.g. CalDAV url and username)
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<CalendarEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}
