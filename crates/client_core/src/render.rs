//! Plain-text rendering of view-model pieces.
//!
//! Every string that originates outside the client (file names, answers,
//! previews, backend error text) goes through [`escape_terminal`] before it is
//! written out. [`escape_html`] is the equivalent for HTML renderers.

use std::fmt::Write as _;

use shared::{
    domain::ChatRole,
    protocol::{SourceCitation, SystemInfo},
};

use crate::{
    notifications::{Notification, NotificationKind},
    transcript::{ChatMessage, MessageBody},
    view::FileRow,
};

pub const PENDING_REPLY_TEXT: &str = "Answering...";
const PREVIEW_LIMIT: usize = 250;

pub fn escape_terminal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' | '\t' => out.push(ch),
            '\r' => {}
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn truncate_preview(preview: &str) -> String {
    if preview.chars().count() <= PREVIEW_LIMIT {
        return preview.to_string();
    }
    let mut cut: String = preview.chars().take(PREVIEW_LIMIT).collect();
    cut.push_str("...");
    cut
}

pub fn citation_label(source: &SourceCitation) -> String {
    format!(
        "[Document {}] Page {} - {}",
        source.id,
        escape_terminal(&source.page.to_string()),
        escape_terminal(&source.file)
    )
}

pub fn render_message(message: &ChatMessage) -> Vec<String> {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
    };
    let body = match &message.body {
        MessageBody::Pending => PENDING_REPLY_TEXT.to_string(),
        MessageBody::Text(text) | MessageBody::Error(text) => escape_terminal(text),
    };

    let mut lines = vec![format!("#{} {speaker}> {body}", message.id)];
    if message.sources.is_empty() {
        return lines;
    }

    let marker = if message.sources_expanded { "▾" } else { "▸" };
    lines.push(format!("    Sources ({}) {marker}", message.sources.len()));
    if message.sources_expanded {
        for source in &message.sources {
            lines.push(format!("      {}", citation_label(source)));
            lines.push(format!(
                "        {}",
                escape_terminal(&truncate_preview(&source.preview))
            ));
        }
    }
    lines
}

pub fn render_notification(notification: &Notification) -> String {
    let tag = match notification.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Warning => "warning",
        NotificationKind::Error => "error",
    };
    format!("[{tag}] {}", escape_terminal(&notification.message))
}

pub fn render_files(files: &[FileRow]) -> Vec<String> {
    if files.is_empty() {
        return vec!["(no files selected)".to_string()];
    }
    files
        .iter()
        .map(|row| format!("  {}. {}", row.index + 1, escape_terminal(&row.name)))
        .collect()
}

pub fn render_system_info(info: &SystemInfo) -> String {
    let mut line = format!(
        "model: {} | chunk size: {} | top-k: {}",
        escape_terminal(&info.model),
        info.chunk_size,
        info.top_k
    );
    if let Some(embedding) = &info.embedding_model {
        let _ = write!(line, " | embeddings: {}", escape_terminal(embedding));
    }
    line
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
