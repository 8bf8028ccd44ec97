//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod gateway;
pub mod goals;
pub mod jars;
pub mod notifications;
pub mod records;
pub mod transactions;
pub mod users;

// Re-export all handlers for use in router
pub use auth::*;
pub use gateway::*;
pub use goals::*;
pub use jars::*;
pub use notifications::*;
pub use records::*;
pub use transactions::*;
pub use users::*;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::AppError;

/// Parse a JSON object body; an empty body is an empty object
pub(crate) fn json_body(bytes: &Bytes) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value =
        serde_json::from_slice(bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;
    if !value.is_object() {
        return Err(AppError::bad_request("Request body must be a JSON object"));
    }
    Ok(value)
}

/// Parse a typed request body
pub(crate) fn typed_body<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, AppError> {
    serde_json::from_value(json_body(bytes)?)
        .map_err(|e| AppError::bad_request(&format!("Invalid request: {}", e)))
}
