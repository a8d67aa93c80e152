use shared::domain::ServerFileRef;
use uuid::Uuid;

use crate::files::PendingFile;

/// Enablement of the user-facing controls, derived from session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub file_selection_enabled: bool,
    pub analyze_enabled: bool,
    pub chat_enabled: bool,
    pub send_enabled: bool,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    pending_files: Vec<PendingFile>,
    server_refs: Vec<ServerFileRef>,
    analyzed: bool,
    indexed_chunks: Option<u64>,
    analysis_in_flight: bool,
    chat_in_flight: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            pending_files: Vec::new(),
            server_refs: Vec::new(),
            analyzed: false,
            indexed_chunks: None,
            analysis_in_flight: false,
            chat_in_flight: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pending_files(&self) -> &[PendingFile] {
        &self.pending_files
    }

    pub fn server_refs(&self) -> &[ServerFileRef] {
        &self.server_refs
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn indexed_chunks(&self) -> Option<u64> {
        self.indexed_chunks
    }

    pub fn analysis_in_flight(&self) -> bool {
        self.analysis_in_flight
    }

    pub fn chat_in_flight(&self) -> bool {
        self.chat_in_flight
    }

    pub fn controls(&self) -> Controls {
        Controls {
            file_selection_enabled: !self.analysis_in_flight,
            analyze_enabled: !self.pending_files.is_empty() && !self.analysis_in_flight,
            chat_enabled: self.analyzed,
            send_enabled: self.analyzed && !self.chat_in_flight,
        }
    }

    pub(crate) fn add_files(&mut self, files: Vec<PendingFile>) {
        self.pending_files.extend(files);
    }

    pub(crate) fn remove_file(&mut self, index: usize) -> Option<PendingFile> {
        (index < self.pending_files.len()).then(|| self.pending_files.remove(index))
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending_files.clear();
    }

    pub(crate) fn set_analysis_in_flight(&mut self, in_flight: bool) {
        self.analysis_in_flight = in_flight;
    }

    pub(crate) fn set_chat_in_flight(&mut self, in_flight: bool) {
        self.chat_in_flight = in_flight;
    }

    pub(crate) fn record_upload(&mut self, refs: Vec<ServerFileRef>) {
        self.server_refs = refs;
    }

    /// Once set, `analyzed` is never cleared for the rest of the session.
    pub(crate) fn mark_analyzed(&mut self, chunks: u64) {
        self.analyzed = true;
        self.indexed_chunks = Some(chunks);
    }
}
