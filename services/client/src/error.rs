//! services/client/src/error.rs
//!
//! Defines the primary error type for the session client.

use crate::config::ConfigError;
use biro_core::ports::PortError;
use reqwest::StatusCode;
use serde_json::Value;

/// The body of a non-2xx response. JSON bodies keep their raw text too.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorBody {
    Json { value: Value, raw: String },
    Text(String),
    Empty,
}

impl ApiErrorBody {
    /// Classifies a response body. `is_json` comes from the `Content-Type`;
    /// JSON that fails to parse is kept as text.
    pub fn parse(text: String, is_json: bool) -> Self {
        if text.trim().is_empty() {
            return ApiErrorBody::Empty;
        }
        if is_json {
            if let Ok(value) = serde_json::from_str(&text) {
                return ApiErrorBody::Json { value, raw: text };
            }
        }
        ApiErrorBody::Text(text)
    }
}

/// A non-2xx HTTP response from the portal.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub status_text: String,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ApiErrorBody) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        }
    }

    /// The JSON `message` field if present, else the raw text, else the status text.
    pub fn detail(&self) -> String {
        let raw = match &self.body {
            ApiErrorBody::Json { value, raw } => {
                if let Some(message) = value.get("message").and_then(Value::as_str) {
                    return message.to_string();
                }
                raw
            }
            ApiErrorBody::Text(text) => text,
            ApiErrorBody::Empty => return self.status_text.clone(),
        };
        match raw.trim() {
            "" => self.status_text.clone(),
            trimmed => trimmed.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status.as_u16(), self.detail())
    }
}

impl std::error::Error for ApiError {}

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-level failure before any response was obtained.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A 2xx response whose body did not match the expected shape.
    #[error("Invalid response from the portal: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No credentials available to log in")]
    MissingCredentials,

    #[error("Login cancelled")]
    Cancelled,

    #[error("Prompt error: {0}")]
    Prompt(PortError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<PortError> for ClientError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Cancelled => ClientError::Cancelled,
            other => ClientError::Prompt(other),
        }
    }
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api(api) => Some(api.status),
            _ => None,
        }
    }

    /// The authentication error case, intercepted by the re-authentication wrapper.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
