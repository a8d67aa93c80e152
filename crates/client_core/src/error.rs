//! Client error taxonomy and the mapping from failures to user-facing text.

use std::path::PathBuf;

use shared::{error::ApiException, protocol::EnvelopeError};
use thiserror::Error;

pub const ANALYZE_UNREACHABLE_MESSAGE: &str =
    "Cannot reach the server. Make sure the backend application is running.";
pub const CHAT_UNREACHABLE_MESSAGE: &str =
    "Could not communicate with the server. Make sure the backend application is running.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Backend(#[from] ApiException),
    #[error("request to {endpoint} could not complete: {message}")]
    Transport { endpoint: String, message: String },
    #[error("malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("client setup failed: {0}")]
    Setup(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Backend,
    Transport,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    Analyze,
    Chat,
    SystemInfo,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    pub fn transport(endpoint: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn from_envelope(endpoint: &str, err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Rejected(rejected) => Self::Backend(rejected),
            EnvelopeError::Malformed(source) => Self::Decode {
                endpoint: endpoint.to_string(),
                message: source.to_string(),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Backend(_) | Self::Decode { .. } => ErrorCategory::Backend,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Setup(_) | Self::Io { .. } => ErrorCategory::Local,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    /// Text shown to the user. Backend rejections are passed through verbatim;
    /// transport failures become an instruction to check the backend.
    pub fn user_message(&self, context: ErrorContext) -> String {
        match (self, context) {
            (Self::Transport { .. }, ErrorContext::Chat) => CHAT_UNREACHABLE_MESSAGE.to_string(),
            (Self::Transport { .. }, _) => ANALYZE_UNREACHABLE_MESSAGE.to_string(),
            (Self::Backend(rejected), _) => rejected.message.clone(),
            (other, _) => other.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
