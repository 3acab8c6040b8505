//! services/annotator/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the annotation backend.
//! It implements the `Transport` port from the `core` crate over `reqwest`.

use annotation_core::envelope::is_truthy;
use annotation_core::{PortError, PortResult, Transport};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }
}

/// Joins the base URL and a `/<Entity>/<action>` path with exactly one slash.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turns a raw HTTP answer into the JSON the core inspects.
///
/// A body carrying a truthy `error` is handed back even on a failing status,
/// so the core reports the backend's own message.
pub(crate) fn interpret(path: &str, status: StatusCode, body: &str) -> PortResult<Value> {
    let parsed = if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(body)
    };

    if status.is_success() {
        return parsed.map_err(|e| {
            PortError::RemoteCallFailed(format!("{}: invalid JSON body: {}", path, e))
        });
    }

    warn!(path, status = %status, "Backend answered with a non-success status");
    match parsed {
        Ok(value) if value.get("error").is_some_and(is_truthy) => Ok(value),
        _ => Err(PortError::RemoteCallFailed(format!("{}: HTTP {}", path, status))),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> PortResult<Value> {
        let url = self.endpoint_url(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::RemoteCallFailed(format!("{}: {}", path, e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::RemoteCallFailed(format!("{}: {}", path, e)))?;
        interpret(path, status, &text)
    }
}
