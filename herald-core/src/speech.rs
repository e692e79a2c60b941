//! Delivering notification text to the user.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::info;

use crate::config::ConfigHandle;
use crate::error::{HeraldError, HeraldResult};

/// Speaks (or otherwise delivers) one message.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> HeraldResult<()>;
}

/// The `[speech]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Program to run, e.g. `espeak` or `say`.
    pub command: String,
    /// Arguments placed before the text, which is always the last argument.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Runs an external text-to-speech program and waits for it to finish.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    config: SpeechConfig,
}

impl CommandSpeaker {
    pub fn new(config: SpeechConfig) -> Self {
        CommandSpeaker { config }
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> HeraldResult<()> {
        let output = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                HeraldError::Speech(format!("Failed to run {}: {}", self.config.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HeraldError::Speech(format!(
                "{} exited with status {}: {}",
                self.config.command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Writes messages to the log instead of speaking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeaker;

#[async_trait]
impl Speaker for LogSpeaker {
    async fn speak(&self, text: &str) -> HeraldResult<()> {
        info!(text, "notification");
        Ok(())
    }
}

/// Uses the `[speech]` table current at the time of each message, or the log
/// when none is configured.
#[derive(Debug, Clone)]
pub struct ConfiguredSpeaker {
    config: Arc<ConfigHandle>,
}

impl ConfiguredSpeaker {
    pub fn new(config: Arc<ConfigHandle>) -> Self {
        ConfiguredSpeaker { config }
    }
}

#[async_trait]
impl Speaker for ConfiguredSpeaker {
    async fn speak(&self, text: &str) -> HeraldResult<()> {
        match self.config.current().speech.clone() {
            Some(speech) => CommandSpeaker::new(speech).speak(text).await,
            None => LogSpeaker.speak(text).await,
        }
    }
}
