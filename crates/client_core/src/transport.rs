//! reqwest-backed implementation of [`BackendClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::PDF_MIME_TYPE,
    error::ApiException,
    protocol::{
        AnalyzeRequest, AnalyzeResponse, ApiEnvelope, ChatRequest, ChatResponse, SystemInfo,
        UploadResponse, ANALYZE_PATH, CHAT_PATH, SYSTEM_INFO_PATH, UPLOAD_FIELD, UPLOAD_PATH,
    },
};
use tracing::{debug, info};
use url::Url;

use crate::{error::ClientError, files::PendingFile, BackendClient};

pub struct HttpBackendClient {
    http: Client,
    server_url: String,
}

impl HttpBackendClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(server_url, None)
    }

    /// Builds a client. Without a timeout, requests run until the network
    /// stack or the backend resolves them.
    pub fn with_timeout(server_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let server_url = normalize_server_url(server_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::setup(format!("failed to build http client: {e}")))?;
        Ok(Self { http, server_url })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(path, e))?;
        let envelope = match ApiEnvelope::parse(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Backend(ApiException::new(
                    Some(status.as_u16()),
                    format!("server returned {status}"),
                )));
            }
            Err(err) => return Err(ClientError::from_envelope(path, err)),
        };
        debug!(endpoint = path, status = status.as_u16(), success = envelope.success, "decoded response");
        envelope
            .into_result()
            .map_err(|err| ClientError::from_envelope(path, err))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(path, e))?;
        Self::decode(path, response).await
    }
}

/// Accepts `http`/`https` URLs without query or fragment and strips trailing
/// slashes so endpoint paths can be appended directly.
pub fn normalize_server_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| ClientError::validation(format!("invalid server url '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::validation(
            "server_url must start with http:// or https://",
        ));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ClientError::validation(
            "server_url must not carry a query string or fragment",
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn file_part(file: &PendingFile) -> Result<Part, ClientError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| ClientError::Io {
            path: file.path.clone(),
            source,
        })?;
    Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(PDF_MIME_TYPE)
        .map_err(|e| ClientError::setup(format!("invalid upload part: {e}")))
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn upload(&self, files: &[PendingFile]) -> Result<UploadResponse, ClientError> {
        let mut form = Form::new();
        for file in files {
            form = form.part(UPLOAD_FIELD, file_part(file).await?);
        }
        info!(files = files.len(), "uploading pdf files");
        let response = self
            .http
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::transport(UPLOAD_PATH, e))?;
        let uploaded: UploadResponse = Self::decode(UPLOAD_PATH, response).await?;
        for summary in &uploaded.files {
            debug!(name = %summary.name, size = summary.size, "backend stored upload");
        }
        Ok(uploaded)
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ClientError> {
        info!(files = request.files.len(), "requesting analysis");
        self.post_json(ANALYZE_PATH, request).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        info!(question_len = request.question.len(), "sending chat question");
        self.post_json(CHAT_PATH, request).await
    }

    async fn system_info(&self) -> Result<SystemInfo, ClientError> {
        let response = self
            .http
            .get(self.endpoint(SYSTEM_INFO_PATH))
            .send()
            .await
            .map_err(|e| ClientError::transport(SYSTEM_INFO_PATH, e))?;
        Self::decode(SYSTEM_INFO_PATH, response).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
