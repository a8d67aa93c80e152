//! The session controller: owns session state and drives the upload, analyze
//! and chat exchanges against a [`BackendClient`].

use std::{sync::Arc, time::Instant};

use shared::{
    domain::MessageId,
    protocol::{AnalyzeRequest, ChatRequest, SystemInfo},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ErrorContext},
    files::{partition_selection, PendingFile},
    notifications::{Notification, NotificationCenter, NotificationKind},
    session::{Controls, Session},
    transcript::{ChatMessage, MessageBody, Transcript},
    view::{FileRow, ViewState},
    BackendClient, ClientEvent,
};

pub const ONLY_PDF_MESSAGE: &str = "Only PDF files can be uploaded.";
pub const ANALYZE_FIRST_MESSAGE: &str = "Please run the analysis first.";
pub const NO_FILES_MESSAGE: &str = "Select at least one PDF file first.";
pub const BUSY_MESSAGE: &str = "Files cannot be changed while an analysis is running.";
pub const UPLOADING_TEXT: &str = "Uploading PDF files...";
pub const ANALYZING_TEXT: &str = "Analyzing...";

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub notification_ttl: std::time::Duration,
    /// Keep the pending list after a successful analysis so the same set can
    /// be re-submitted together with new files.
    pub retain_files_after_analyze: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            notification_ttl: crate::notifications::DEFAULT_NOTIFICATION_TTL,
            retain_files_after_analyze: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionOutcome {
    pub added: usize,
    pub rejected: usize,
}

pub struct SessionController {
    backend: Arc<dyn BackendClient>,
    options: ControllerOptions,
    session: Session,
    transcript: Transcript,
    notifications: NotificationCenter,
    loading: Option<String>,
    system_info: Option<SystemInfo>,
    events: broadcast::Sender<ClientEvent>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self::with_options(backend, ControllerOptions::default())
    }

    pub fn with_options(backend: Arc<dyn BackendClient>, options: ControllerOptions) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            backend,
            notifications: NotificationCenter::new(options.notification_ttl),
            options,
            session: Session::new(),
            transcript: Transcript::new(),
            loading: None,
            system_info: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn controls(&self) -> Controls {
        self.session.controls()
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.latest()
    }

    pub fn system_info(&self) -> Option<&SystemInfo> {
        self.system_info.as_ref()
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            files: self
                .session
                .pending_files()
                .iter()
                .enumerate()
                .map(|(index, file)| FileRow {
                    index,
                    name: file.name.clone(),
                })
                .collect(),
            controls: self.session.controls(),
            loading: self.loading.clone(),
            notifications: self.notifications.active().cloned().collect(),
            messages: self.transcript.messages().to_vec(),
            system_info: self.system_info.clone(),
            indexed_chunks: self.session.indexed_chunks(),
        }
    }

    fn emit(&self, event: ClientEvent) {
        // Fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let notification = self.notifications.push(kind, message);
        debug!(kind = ?notification.kind, "notification raised");
        self.emit(ClientEvent::Notified(notification));
    }

    fn emit_controls(&self) {
        self.emit(ClientEvent::ControlsChanged(self.session.controls()));
    }

    fn emit_files(&self) {
        self.emit(ClientEvent::FilesChanged {
            count: self.session.pending_files().len(),
        });
        self.emit_controls();
    }

    fn show_loading(&mut self, text: &str) {
        self.loading = Some(text.to_string());
        self.emit(ClientEvent::LoadingChanged(self.loading.clone()));
    }

    fn hide_loading(&mut self) {
        self.loading = None;
        self.emit(ClientEvent::LoadingChanged(None));
    }

    /// Drops notifications older than the configured ttl.
    pub fn expire_notifications(&mut self, now: Instant) -> Vec<Notification> {
        let expired = self.notifications.expire(now);
        for notification in &expired {
            self.emit(ClientEvent::NotificationDismissed(notification.id));
        }
        expired
    }

    /// Adds the PDFs from a user selection to the pending list. Anything that
    /// is not a readable PDF is rejected with a warning.
    pub fn add_files<I, P>(&mut self, paths: I) -> SelectionOutcome
    where
        I: IntoIterator<Item = P>,
        P: AsRef<std::path::Path>,
    {
        if self.session.analysis_in_flight() {
            self.notify(NotificationKind::Warning, BUSY_MESSAGE);
            return SelectionOutcome::default();
        }

        let selection = partition_selection(paths);
        let outcome = SelectionOutcome {
            added: selection.accepted.len(),
            rejected: selection.rejected_count(),
        };

        if selection.accepted.is_empty() {
            let message = if selection.missing.is_empty() {
                ONLY_PDF_MESSAGE.to_string()
            } else {
                format!("File not found: {}", selection.missing[0].display())
            };
            self.notify(NotificationKind::Warning, message);
            return outcome;
        }

        self.session.add_files(selection.accepted);
        if outcome.rejected > 0 {
            self.notify(
                NotificationKind::Warning,
                format!(
                    "Skipped {} file(s) that are not readable PDFs.",
                    outcome.rejected
                ),
            );
        }
        self.emit_files();
        outcome
    }

    pub fn remove_file(&mut self, index: usize) -> Option<PendingFile> {
        if self.session.analysis_in_flight() {
            self.notify(NotificationKind::Warning, BUSY_MESSAGE);
            return None;
        }
        match self.session.remove_file(index) {
            Some(file) => {
                self.emit_files();
                Some(file)
            }
            None => {
                self.notify(
                    NotificationKind::Warning,
                    format!("No pending file at position {}.", index.saturating_add(1)),
                );
                None
            }
        }
    }

    /// Uploads every pending file and asks the backend to index them. Returns
    /// the indexed chunk count.
    pub async fn submit_for_analysis(&mut self) -> Result<u64, ClientError> {
        if self.session.pending_files().is_empty() {
            self.notify(NotificationKind::Warning, NO_FILES_MESSAGE);
            return Err(ClientError::validation(NO_FILES_MESSAGE));
        }

        self.session.set_analysis_in_flight(true);
        self.emit_controls();
        self.show_loading(UPLOADING_TEXT);

        let result = self.run_analysis_chain().await;

        self.hide_loading();
        self.session.set_analysis_in_flight(false);

        match &result {
            Ok(chunks) => {
                info!(session = %self.session.id(), chunks, "analysis complete");
                if !self.options.retain_files_after_analyze {
                    self.session.clear_pending();
                    self.emit(ClientEvent::FilesChanged { count: 0 });
                }
                self.emit(ClientEvent::AnalysisCompleted { chunks: *chunks });
                self.notify(NotificationKind::Success, format!("{chunks} chunks indexed."));
            }
            Err(err) => {
                warn!(session = %self.session.id(), error = %err, "analysis failed");
                self.notify(
                    NotificationKind::Error,
                    err.user_message(ErrorContext::Analyze),
                );
            }
        }
        self.emit_controls();
        result
    }

    async fn run_analysis_chain(&mut self) -> Result<u64, ClientError> {
        let batch = self.session.pending_files().to_vec();
        let uploaded = self.backend.upload(&batch).await?;

        let refs = uploaded
            .file_refs()
            .filter(|refs| refs.len() == batch.len())
            .ok_or_else(|| mismatched_upload(batch.len(), &uploaded.paths, &uploaded.filenames))?;
        self.session.record_upload(refs);

        self.show_loading(ANALYZING_TEXT);
        let request = AnalyzeRequest::from_refs(self.session.server_refs());
        let analyzed = self.backend.analyze(&request).await?;
        if let Some(message) = &analyzed.message {
            debug!(%message, "backend analysis message");
        }

        self.session.mark_analyzed(analyzed.chunks);
        Ok(analyzed.chunks)
    }

    /// Sends a question to the backend and records both sides in the
    /// transcript. Blank input is ignored.
    pub async fn send_chat(&mut self, question: &str) -> Result<MessageId, ClientError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::validation("question is empty"));
        }
        if !self.session.is_analyzed() {
            self.notify(NotificationKind::Warning, ANALYZE_FIRST_MESSAGE);
            return Err(ClientError::validation(ANALYZE_FIRST_MESSAGE));
        }
        if self.session.chat_in_flight() {
            return Err(ClientError::validation("a chat request is already running"));
        }

        let user = self.transcript.push_user(question).clone();
        self.emit(ClientEvent::MessageAppended(user));
        let placeholder = self.transcript.push_placeholder().clone();
        let placeholder_id = placeholder.id;
        self.emit(ClientEvent::MessageAppended(placeholder));

        self.session.set_chat_in_flight(true);
        self.emit_controls();

        let result = self
            .backend
            .chat(&ChatRequest {
                question: question.to_string(),
            })
            .await;

        let (body, sources, outcome) = match result {
            Ok(response) => {
                info!(sources = response.sources.len(), "chat answer received");
                (MessageBody::Text(response.answer), response.sources, Ok(placeholder_id))
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                let text = format!("Error: {}", err.user_message(ErrorContext::Chat));
                (MessageBody::Error(text), Vec::new(), Err(err))
            }
        };

        if let Some(resolved) = self.transcript.resolve(placeholder_id, body, sources) {
            let resolved = resolved.clone();
            self.emit(ClientEvent::MessageUpdated(resolved));
        }

        self.session.set_chat_in_flight(false);
        self.emit_controls();
        outcome
    }

    /// Expands or collapses the source list of a message. Returns the new
    /// expanded state, or `false` when the message has no sources.
    pub fn toggle_sources(&mut self, id: MessageId) -> bool {
        match self.transcript.toggle_sources(id) {
            Some(expanded) => {
                self.emit(ClientEvent::SourcesToggled { id, expanded });
                expanded
            }
            None => false,
        }
    }

    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.transcript.get(id)
    }

    /// Reads display parameters from the backend. Failures are logged and
    /// leave the rest of the session untouched.
    pub async fn fetch_system_info(&mut self) -> Option<SystemInfo> {
        match self.backend.system_info().await {
            Ok(info) => {
                self.system_info = Some(info.clone());
                self.emit(ClientEvent::SystemInfoLoaded(info.clone()));
                Some(info)
            }
            Err(err) => {
                warn!(
                    error = %err.user_message(ErrorContext::SystemInfo),
                    "failed to load system info"
                );
                None
            }
        }
    }
}

fn mismatched_upload(expected: usize, paths: &[String], filenames: &[String]) -> ClientError {
    ClientError::Backend(shared::error::ApiException::new(
        None,
        format!(
            "upload returned {} path(s) and {} name(s) for {expected} file(s)",
            paths.len(),
            filenames.len()
        ),
    ))
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("messages", &self.transcript.len())
            .field("loading", &self.loading)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
