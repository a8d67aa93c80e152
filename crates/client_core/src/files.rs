use std::path::{Path, PathBuf};

use shared::domain::PDF_MIME_TYPE;

/// A file chosen by the user and waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: Option<u64>,
}

impl PendingFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let size_bytes = std::fs::metadata(&path).ok().map(|m| m.len());
        Self {
            path,
            name,
            mime_type,
            size_bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }

    pub fn exists(&self) -> bool {
        self.size_bytes.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Selection {
    pub accepted: Vec<PendingFile>,
    pub not_pdf: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl Selection {
    pub fn rejected_count(&self) -> usize {
        self.not_pdf.len() + self.missing.len()
    }
}

/// Splits a raw selection into uploadable PDFs and rejected entries, keeping
/// the selection order of accepted files.
pub fn partition_selection<I, P>(paths: I) -> Selection
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut selection = Selection::default();
    for path in paths {
        let file = PendingFile::from_path(path.as_ref());
        if !file.is_pdf() {
            selection.not_pdf.push(file.path);
        } else if !file.exists() {
            selection.missing.push(file.path);
        } else {
            selection.accepted.push(file);
        }
    }
    selection
}
