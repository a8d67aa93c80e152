//! Append-only chat transcript with in-place resolution of pending replies.

use chrono::{DateTime, Utc};
use shared::{
    domain::{ChatRole, MessageId},
    protocol::SourceCitation,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Assistant reply still in flight.
    Pending,
    Text(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub body: MessageBody,
    pub sources: Vec<SourceCitation>,
    pub sources_expanded: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_pending(&self) -> bool {
        self.body == MessageBody::Pending
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(text) | MessageBody::Error(text) => Some(text),
            MessageBody::Pending => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: i64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, role: ChatRole, body: MessageBody) -> &ChatMessage {
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: MessageId(self.next_id),
            role,
            body,
            sources: Vec::new(),
            sources_expanded: false,
            created_at: Utc::now(),
        });
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.append(ChatRole::User, MessageBody::Text(text.into()))
    }

    pub fn push_placeholder(&mut self) -> &ChatMessage {
        self.append(ChatRole::Assistant, MessageBody::Pending)
    }

    /// Fills a pending placeholder. Returns `None` if `id` is unknown or was
    /// already resolved.
    pub fn resolve(
        &mut self,
        id: MessageId,
        body: MessageBody,
        sources: Vec<SourceCitation>,
    ) -> Option<&ChatMessage> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.is_pending())?;
        message.body = body;
        message.sources = sources;
        message.sources_expanded = false;
        Some(message)
    }

    /// Flips the expanded state of a message's source list and returns the
    /// new state. Messages without sources are left alone.
    pub fn toggle_sources(&mut self, id: MessageId) -> Option<bool> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id && !m.sources.is_empty())?;
        message.sources_expanded = !message.sources_expanded;
        Some(message.sources_expanded)
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_with_sources(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| !m.sources.is_empty())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/transcript_tests.rs"]
mod tests;
