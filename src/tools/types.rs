//! Core tool types.
//!
//! Defines the [`Tool`] trait every tool implements, the [`ToolError`]
//! failure taxonomy, and [`ToolResult`], which renders either outcome as the
//! uniform `{ "success": ... }` envelope returned to clients.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ToolMode;
use crate::store::StoreError;

/// Machine-readable failure category carried in the `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    InvalidDate,
    InvalidInput,
    InvalidSpan,
    NotFound,
    UnexpectedError,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::InvalidDate => "invalid_date",
            Self::InvalidInput => "invalid_input",
            Self::InvalidSpan => "invalid_span",
            Self::NotFound => "not_found",
            Self::UnexpectedError => "unexpected_error",
        }
    }
}

/// A failed tool call: category plus human-readable text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDate, message)
    }

    pub fn invalid_span() -> Self {
        Self::new(
            ErrorKind::InvalidSpan,
            "span must be 'this_event' or 'future_events'",
        )
    }
}

impl From<StoreError> for ToolError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PermissionDenied(inner) => {
                Self::new(ErrorKind::PermissionDenied, inner.to_string())
            }
            StoreError::NotFound(message) => Self::new(ErrorKind::NotFound, message),
            StoreError::InvalidInput(message) => Self::new(ErrorKind::InvalidInput, message),
            StoreError::Backend(message) => Self::new(ErrorKind::UnexpectedError, message),
        }
    }
}

/// Outcome of a tool call, ready to render as an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Whether the call succeeded.
    pub success: bool,
    /// Payload fields merged into the envelope on success.
    pub payload: Map<String, Value>,
    /// Failure details when `success` is false.
    pub error: Option<ToolError>,
}

impl ToolResult {
    /// A successful result. Object payloads are flattened into the
    /// envelope; anything else lands under `result`.
    pub fn success(payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("result".to_owned(), other);
                map
            }
        };
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    /// A failed result.
    pub fn failure(error: ToolError) -> Self {
        Self {
            success: false,
            payload: Map::new(),
            error: Some(error),
        }
    }

    /// Render as `{ "success": true, ...payload }` or
    /// `{ "success": false, "error": kind, "message": text }`.
    pub fn to_envelope(&self) -> Value {
        let mut envelope = Map::new();
        envelope.insert("success".to_owned(), Value::Bool(self.success));
        match &self.error {
            Some(error) => {
                envelope.insert("error".to_owned(), Value::from(error.kind.as_str()));
                envelope.insert("message".to_owned(), Value::from(error.message.clone()));
            }
            None => {
                for (key, value) in &self.payload {
                    envelope.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(envelope)
    }
}

impl From<Result<Value, ToolError>> for ToolResult {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(error) => Self::failure(error),
        }
    }
}

/// Serialize a domain value for a payload; failure is `unexpected_error`.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::new(ErrorKind::UnexpectedError, format!("serialization failed: {e}")))
}

/// A callable operation.
///
/// Tools must be `Send + Sync`: the server shares them across blocking
/// worker threads. Implementations parse their own arguments and return the
/// success payload as a JSON object.
pub trait Tool: Send + Sync {
    /// Tool name as exposed to clients (e.g. `list_events`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn schema(&self) -> Value;

    /// Execute with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] whose kind becomes the envelope's `error`.
    fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// Whether the tool is exposed in `mode`. Read-only tools return true
    /// for every mode; mutating tools only for [`ToolMode::Full`].
    fn allowed_in_mode(&self, mode: ToolMode) -> bool;
}
