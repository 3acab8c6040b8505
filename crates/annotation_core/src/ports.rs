//! crates/annotation_core/src/ports.rs
//!
//! Defines the boundary between the annotation core and the remote backend.
//! The core only ever talks to a `Transport`; concrete HTTP clients live in
//! the `annotator` service crate, and tests plug in an in-memory backend.

use async_trait::async_trait;
use serde_json::Value;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Errors surfaced by the core's operations.
///
/// Transport and rejection errors are propagated unchanged through every
/// component. Malformed anchor references and contexts without a highlight
/// are recovered locally and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The call never produced a usable response (connection, HTTP status, body decoding).
    #[error("Remote call failed: {0}")]
    RemoteCallFailed(String),
    /// The backend answered with a truthy top-level `error` field.
    /// Missing or expired sessions also land here.
    #[error("Backend rejected the call: {0}")]
    BackendRejected(String),
    /// The payload did not match the shape selected for the call site.
    #[error("Unexpected response shape from {path}: {message}")]
    UnexpectedShape { path: String, message: String },
    #[error("Failed to create highlight: {0}")]
    HighlightCreationFailed(String),
    #[error("Failed to create context: {0}")]
    ContextCreationFailed(String),
    /// A creation call succeeded but carried no identifier.
    #[error("Backend returned no identifier for {0}")]
    MissingId(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// JSON-over-HTTP POST exchange with the backend.
///
/// `path` is always of the form `/<Entity>/<action>`. Implementations return the
/// decoded JSON body, including bodies that carry an `error` field; inspecting
/// that field is the core's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, path: &str, body: Value) -> PortResult<Value>;
}
