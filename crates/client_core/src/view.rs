//! Snapshot of everything a front end needs to draw the session.

use shared::protocol::SystemInfo;

use crate::{notifications::Notification, session::Controls, transcript::ChatMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub files: Vec<FileRow>,
    pub controls: Controls,
    pub loading: Option<String>,
    pub notifications: Vec<Notification>,
    pub messages: Vec<ChatMessage>,
    pub system_info: Option<SystemInfo>,
    pub indexed_chunks: Option<u64>,
}

impl ViewState {
    pub fn is_blocked(&self) -> bool {
        self.loading.is_some()
    }
}
