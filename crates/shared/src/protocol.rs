use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    domain::{DocumentId, PageRef, ServerFileRef},
    error::{ApiError, ApiException},
};

pub const UPLOAD_PATH: &str = "/api/upload";
pub const ANALYZE_PATH: &str = "/api/analyze";
pub const CHAT_PATH: &str = "/api/chat";
pub const SYSTEM_INFO_PATH: &str = "/api/system-info";

/// Multipart field name carrying each uploaded PDF.
pub const UPLOAD_FIELD: &str = "files";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFileSummary {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub paths: Vec<String>,
    pub filenames: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<UploadedFileSummary>,
}

impl UploadResponse {
    /// Pairs server paths with display names. `None` when the two lists
    /// disagree in length.
    pub fn file_refs(&self) -> Option<Vec<ServerFileRef>> {
        if self.paths.len() != self.filenames.len() {
            return None;
        }
        Some(
            self.paths
                .iter()
                .zip(&self.filenames)
                .map(|(path, name)| ServerFileRef {
                    server_path: path.clone(),
                    display_name: name.clone(),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub files: Vec<String>,
    pub filenames: Vec<String>,
}

impl AnalyzeRequest {
    pub fn from_refs(refs: &[ServerFileRef]) -> Self {
        Self {
            files: refs.iter().map(|r| r.server_path.clone()).collect(),
            filenames: refs.iter().map(|r| r.display_name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeResponse {
    pub chunks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCitation {
    pub id: DocumentId,
    pub page: PageRef,
    pub file: String,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceCitation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInfo {
    pub model: String,
    pub chunk_size: u64,
    pub top_k: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

/// Every endpoint wraps its payload in `{"success": bool, ...}`; on failure
/// the payload is replaced by an `error` string.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Rejected(ApiException),
    #[error("malformed response payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ApiEnvelope {
    pub fn parse(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, EnvelopeError> {
        if !self.success {
            return Err(EnvelopeError::Rejected(ApiException::from(ApiError {
                success: false,
                error: self.error,
            })));
        }
        Ok(serde_json::from_value(Value::Object(self.body))?)
    }
}
