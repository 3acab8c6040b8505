//! crates/annotation_core/src/envelope.rs
//!
//! Normalization of the backend's response shapes into flat values.
//!
//! The backend answers in one of three shapes depending on the operation:
//!
//! * direct: `{ "result": T }` (or `{ "<key>": T }` for creation calls),
//! * fan-out: `[{ "result": T }, ...]`, one element per matching backend rule,
//! * field-wrapped: `{ "<field>": [{ "<singular>": T }, ...] }`.
//!
//! Call sites pick the shape explicitly; nothing here guesses. A `null` or
//! absent wrapped value is an absent result, never a placeholder.

use crate::ports::{PortError, PortResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

const RESULT_KEY: &str = "result";

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Fails with `BackendRejected` when the payload carries a truthy top-level `error`.
pub fn reject_errors(path: &str, raw: &Value) -> PortResult<()> {
    match raw.get("error") {
        Some(error) if is_truthy(error) => {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            tracing::debug!(path, error = %message, "Backend rejected call");
            Err(PortError::BackendRejected(message))
        }
        _ => Ok(()),
    }
}

fn shape_error(path: &str, message: impl Into<String>) -> PortError {
    PortError::UnexpectedShape {
        path: path.to_string(),
        message: message.into(),
    }
}

fn from_value<T: DeserializeOwned>(path: &str, value: Value) -> PortResult<T> {
    serde_json::from_value(value).map_err(|e| shape_error(path, e.to_string()))
}

/// Takes `key` out of an object; `null` and absence both map to `None`.
fn take_key<T: DeserializeOwned>(path: &str, value: &mut Value, key: &str) -> PortResult<Option<T>> {
    let object = value
        .as_object_mut()
        .ok_or_else(|| shape_error(path, format!("expected an object holding '{}'", key)))?;
    match object.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(inner) => from_value(path, inner).map(Some),
    }
}

fn into_array(path: &str, value: Value) -> PortResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(shape_error(path, format!("expected an array, got {}", kind_of(&other)))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//=========================================================================================
// Direct
//=========================================================================================

/// `{ "result": T }` → `T`.
pub fn direct<T: DeserializeOwned>(path: &str, raw: Value) -> PortResult<Option<T>> {
    keyed(path, raw, RESULT_KEY)
}

/// `{ "<key>": T }` → `T`.
pub fn keyed<T: DeserializeOwned>(path: &str, mut raw: Value, key: &str) -> PortResult<Option<T>> {
    take_key(path, &mut raw, key)
}

//=========================================================================================
// Fan-out
//=========================================================================================

/// `[{ "result": T }, ...]` → `[T, ...]`, order preserved.
pub fn fan_out<T: DeserializeOwned>(path: &str, raw: Value) -> PortResult<Vec<T>> {
    fan_out_keyed(path, raw, RESULT_KEY)
}

/// `[{ "<key>": T }, ...]` → `[T, ...]`. Elements whose value is null are skipped.
pub fn fan_out_keyed<T: DeserializeOwned>(path: &str, raw: Value, key: &str) -> PortResult<Vec<T>> {
    let mut out = Vec::new();
    for mut element in into_array(path, raw)? {
        if let Some(value) = take_key(path, &mut element, key)? {
            out.push(value);
        }
    }
    Ok(out)
}

/// The first rule's `<key>` value of a fan-out response.
pub fn first<T: DeserializeOwned>(path: &str, raw: Value, key: &str) -> PortResult<Option<T>> {
    match into_array(path, raw)?.into_iter().next() {
        Some(mut element) => take_key(path, &mut element, key),
        None => Ok(None),
    }
}

/// `[{ "<field>": [T, ...] }]` → `[T, ...]` taken from the first rule.
pub fn fan_out_collection<T: DeserializeOwned>(path: &str, raw: Value, field: &str) -> PortResult<Vec<T>> {
    Ok(first::<Vec<T>>(path, raw, field)?.unwrap_or_default())
}

/// Like [`fan_out_collection`], but decodes each element on its own and drops
/// the ones that do not fit `T` instead of failing the whole listing.
pub fn fan_out_collection_lenient<T: DeserializeOwned>(
    path: &str,
    raw: Value,
    field: &str,
) -> PortResult<Vec<T>> {
    let items = first::<Vec<Value>>(path, raw, field)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(path, error = %e, "Dropping undecodable record");
                None
            }
        })
        .collect())
}

//=========================================================================================
// Field-wrapped collections
//=========================================================================================

/// `{ "<field>": [{ "<singular>": T }, ...] }` → `[T, ...]`.
pub fn wrapped<T: DeserializeOwned>(
    path: &str,
    mut raw: Value,
    field: &str,
    singular: &str,
) -> PortResult<Vec<T>> {
    match take_key::<Value>(path, &mut raw, field)? {
        Some(items) => fan_out_keyed(path, items, singular),
        None => Ok(Vec::new()),
    }
}
