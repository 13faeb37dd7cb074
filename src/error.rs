//! Structured errors for loading and replaying action logs

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code:?}] {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownAction,
    MalformedLog,
    InvalidValue,
    WindowNotFound,
    SimulationFailed,
    Cancelled,
    NotSupported,
    Io,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Add fields to the context, keeping what is already there. A
    /// non-object context is moved under `detail`.
    pub fn extend_context(mut self, fields: serde_json::Value) -> Self {
        let mut merged = match self.context.take() {
            Some(serde_json::Value::Object(map)) => map,
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("detail".to_string(), other);
                map
            }
            None => serde_json::Map::new(),
        };
        if let serde_json::Value::Object(extra) = fields {
            merged.extend(extra);
        }
        self.context = Some(serde_json::Value::Object(merged));
        self
    }

    pub fn unknown_action(tag: &str) -> Self {
        Self::new(
            ErrorCode::UnknownAction,
            format!("No handler for action tag: {}", tag),
        )
        .with_context(serde_json::json!({ "tag": tag }))
    }

    pub fn malformed_log(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedLog, reason)
    }

    pub fn missing_attribute(tag: &str, attribute: &str) -> Self {
        Self::new(
            ErrorCode::MalformedLog,
            format!("<{}> is missing attribute '{}'", tag, attribute),
        )
        .with_context(serde_json::json!({ "tag": tag, "attribute": attribute }))
    }

    pub fn invalid_value(what: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidValue,
            format!("Invalid {}: '{}'", what, value),
        )
        .with_context(serde_json::json!({ "field": what, "value": value }))
    }

    pub fn window_not_found(title: &str) -> Self {
        Self::new(
            ErrorCode::WindowNotFound,
            format!("No open window titled: {}", title),
        )
        .with_context(serde_json::json!({ "title": title }))
    }

    pub fn simulation_failed(action: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::SimulationFailed,
            format!("{} failed: {}", action, reason),
        )
    }

    pub fn cancelled(completed: usize) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            format!("Playback cancelled after {} actions", completed),
        )
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotSupported, message)
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, format!("{:#}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::MalformedLog, e.to_string())
    }
}
