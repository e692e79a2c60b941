//! Error types for herald.

use thiserror::Error;

/// Errors that can occur in herald operations.
#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("No stored event with id '{0}'")]
    NotFound(String),

    #[error("Event id '{0}' cannot be stored: empty or too long")]
    InvalidId(String),

    #[error("Stored event '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Failed to persist event '{id}': {source}")]
    StorageWriteFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch remote events: {0}")]
    RemoteFetchFailed(String),

    #[error("Invalid message template: {0}")]
    TemplateInvalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for herald operations.
pub type HeraldResult<T> = Result<T, HeraldError>;
