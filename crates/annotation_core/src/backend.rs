//! crates/annotation_core/src/backend.rs
//!
//! The single gateway every component uses to reach the backend. It wraps a
//! `Transport`, logs each exchange, and turns a truthy `error` field into a
//! `BackendRejected` failure whatever the transport reported.

use crate::domain::Session;
use crate::envelope;
use crate::ports::{PortResult, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Backend {
    transport: Arc<dyn Transport>,
}

impl Backend {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Posts `body` to `path` and returns the raw payload once it is known not to be an error.
    pub async fn call(&self, path: &str, body: Value) -> PortResult<Value> {
        debug!(path, "Calling backend");
        let raw = self.transport.post(path, body).await?;
        envelope::reject_errors(path, &raw)?;
        Ok(raw)
    }
}

/// Adds the `session` token to a JSON object body when a session is available.
pub(crate) fn with_session(mut body: Value, session: Option<&Session>) -> Value {
    if let (Some(session), Some(object)) = (session, body.as_object_mut()) {
        object.insert("session".to_string(), Value::String(session.token.clone()));
    }
    body
}
