//! Provider subprocess protocol.
//!
//! This module handles communication with external provider binaries
//! (e.g., `herald-provider-caldav`) using JSON over stdin/stdout.
//!
//! Any executable that speaks the protocol can be a provider. Providers own
//! the calendar format and credentials; herald only passes the `[remote]`
//! parameters from its config.

use std::process::Stdio;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::error::{HeraldError, HeraldResult};
use crate::remote::protocol::{Command, ProviderCommand, Request, Response};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn binary_name(&self) -> String {
        format!("herald-provider-{}", self.0)
    }

    fn binary_path(&self) -> HeraldResult<std::path::PathBuf> {
        let binary_name = self.binary_name();
        which::which(&binary_name).map_err(|_| {
            HeraldError::ProviderNotInstalled(format!(
                "{} (looked for '{}' in PATH)",
                self.0, binary_name
            ))
        })
    }

    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> HeraldResult<C::Response> {
        let line = request_line(C::command(), cmd)?;
        let stdout = timeout(PROVIDER_TIMEOUT, self.exchange(&line))
            .await
            .map_err(|_| HeraldError::ProviderTimeout(PROVIDER_TIMEOUT.as_secs()))??;
        parse_response(&stdout)
    }

    /// Run the provider with `line` on stdin and collect its stdout.
    async fn exchange(&self, line: &str) -> HeraldResult<Vec<u8>> {
        let binary_path = self.binary_path()?;

        let mut child = TokioCommand::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HeraldError::RemoteFetchFailed(format!(
                    "could not start {}: {}",
                    binary_path.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(line.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(HeraldError::RemoteFetchFailed(match output.status.code() {
                Some(code) => format!("{} exited with status {}", self.binary_name(), code),
                None => format!("{} was killed by a signal", self.binary_name()),
            }));
        }
        Ok(output.stdout)
    }
}

fn request_line<P: Serialize>(command: Command, params: P) -> HeraldResult<String> {
    let params =
        serde_json::to_value(params).map_err(|e| HeraldError::Serialization(e.to_string()))?;
    let mut line = serde_json::to_string(&Request { command, params })
        .map_err(|e| HeraldError::Serialization(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

fn parse_response<R: DeserializeOwned>(stdout: &[u8]) -> HeraldResult<R> {
    let text = String::from_utf8_lossy(stdout);
    if text.trim().is_empty() {
        return Err(HeraldError::RemoteFetchFailed("provider printed nothing".into()));
    }

    match serde_json::from_str::<Response<R>>(&text) {
        Ok(Response::Success { data }) => Ok(data),
        Ok(Response::Error { error }) => Err(HeraldError::RemoteFetchFailed(error)),
        Err(e) => Err(HeraldError::RemoteFetchFailed(format!(
            "unreadable provider response: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::protocol::ListEvents;

    #[test]
    fn test_binary_name() {
        assert_eq!(
            Provider::from_name("caldav").binary_name(),
            "herald-provider-caldav"
        );
    }

    #[test]
    fn test_request_is_one_line() {
        let line = request_line(
            Command::ListEvents,
            ListEvents {
                remote_config: serde_json::Map::new(),
                from: "a".into(),
                to: "b".into(),
            },
        )
        .unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.starts_with(r#"{"command":"list_events""#));
    }

    #[test]
    fn test_parse_response_outcomes() {
        let ok: Vec<u32> = parse_response(br#"{"status":"success","data":[1,2]}"#).unwrap();
        assert_eq!(ok, vec![1, 2]);

        let err = parse_response::<Vec<u32>>(br#"{"status":"error","error":"bad password"}"#);
        assert!(matches!(err, Err(HeraldError::RemoteFetchFailed(m)) if m == "bad password"));

        for stdout in [&b"  \n"[..], &b"Traceback (most recent call last)"[..]] {
            assert!(matches!(
                parse_response::<Vec<u32>>(stdout),
                Err(HeraldError::RemoteFetchFailed(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_missing_provider_binary() {
        let provider = Provider::from_name("definitely-not-installed-7f3a");
        let result = provider
            .call(ListEvents {
                remote_config: serde_json::Map::new(),
                from: String::new(),
                to: String::new(),
            })
            .await;
        assert!(matches!(result, Err(HeraldError::ProviderNotInstalled(_))));
    }
}
