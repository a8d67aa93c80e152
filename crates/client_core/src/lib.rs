use async_trait::async_trait;
use shared::{
    domain::{MessageId, NotificationId},
    protocol::{
        AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, SystemInfo, UploadResponse,
    },
};

pub mod controller;
pub mod error;
pub mod files;
pub mod notifications;
pub mod render;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod view;

pub use controller::{ControllerOptions, SelectionOutcome, SessionController};
pub use error::{ClientError, ErrorCategory, ErrorContext};
pub use files::PendingFile;
pub use notifications::{Notification, NotificationKind};
pub use session::{Controls, Session};
pub use transcript::{ChatMessage, MessageBody};
pub use transport::HttpBackendClient;
pub use view::ViewState;

/// The four backend exchanges the controller depends on.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn upload(&self, files: &[PendingFile]) -> Result<UploadResponse, ClientError>;
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ClientError>;
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;
    async fn system_info(&self) -> Result<SystemInfo, ClientError>;
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    FilesChanged { count: usize },
    ControlsChanged(Controls),
    LoadingChanged(Option<String>),
    Notified(Notification),
    NotificationDismissed(NotificationId),
    AnalysisCompleted { chunks: u64 },
    MessageAppended(ChatMessage),
    MessageUpdated(ChatMessage),
    SourcesToggled { id: MessageId, expanded: bool },
    SystemInfoLoaded(SystemInfo),
}
