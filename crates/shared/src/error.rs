use serde::{Deserialize, Serialize};
use thiserror::Error;

const UNKNOWN_BACKEND_ERROR: &str = "unknown backend error";

/// Failure body shared by every endpoint: `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(UNKNOWN_BACKEND_ERROR)
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiException {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiException {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ApiException> for ApiError {
    fn from(value: ApiException) -> Self {
        Self::new(value.message)
    }
}

impl From<ApiError> for ApiException {
    fn from(value: ApiError) -> Self {
        Self::new(None, value.message())
    }
}
