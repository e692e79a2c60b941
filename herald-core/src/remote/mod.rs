//! Where today's events come from.
//!
//! [`CalendarSource`] is the seam the scheduler fetches through. The
//! production implementation is [`Remote`], which asks an external provider
//! binary for the events in a [`DateRange`].

pub mod protocol;
pub mod provider;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ConfigHandle;
use crate::date_range::DateRange;
use crate::error::{HeraldError, HeraldResult};
use crate::event::CalendarEvent;
use crate::remote::protocol::ListEvents;
use crate::remote::provider::Provider;

/// Fetches the events within a time window.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn events_between(&self, range: &DateRange) -> HeraldResult<Vec<CalendarEvent>>;
}

/// The `[remote]` config table: a provider name plus provider-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub provider: String,
    #[serde(flatten)]
    pub params: HashMap<String, toml::Value>,
}

impl RemoteConfig {
    fn params_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.params
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Remote {
    provider: Provider,
    config: RemoteConfig,
}

impl Remote {
    pub fn new(config: RemoteConfig) -> Self {
        Remote {
            provider: Provider::from_name(&config.provider),
            config,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

#[async_trait]
impl CalendarSource for Remote {
    async fn events_between(&self, range: &DateRange) -> HeraldResult<Vec<CalendarEvent>> {
        self.provider
            .call(ListEvents {
                remote_config: self.config.params_json(),
                from: range.from_rfc3339(),
                to: range.to_rfc3339(),
            })
            .await
    }
}

/// A [`Remote`] built from the current `[remote]` table on every fetch, so a
/// config reload can switch providers.
#[derive(Debug, Clone)]
pub struct ConfiguredSource {
    config: Arc<ConfigHandle>,
}

impl ConfiguredSource {
    pub fn new(config: Arc<ConfigHandle>) -> Self {
        ConfiguredSource { config }
    }
}

#[async_trait]
impl CalendarSource for ConfiguredSource {
    async fn events_between(&self, range: &DateRange) -> HeraldResult<Vec<CalendarEvent>> {
        let config = self.config.current();
        let remote_config = config.remote.clone().ok_or_else(|| {
            HeraldError::RemoteFetchFailed("no [remote] provider configured".into())
        })?;

        Remote::new(remote_config).events_between(range).await
    }
}
