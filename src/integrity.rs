use crate::corpus;
use crate::error::{HarvestError, Result};
use lopdf::Document;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of checking one persisted document
///
/// An invalid outcome means the file has already been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub path: PathBuf,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Number of pages in the document at `path`
///
/// A document the strict loader rejects is retried from memory with junk before
/// the header cut off and a missing end-of-file marker restored. The file on
/// disk is never changed. The error of the strict load is the one reported.
pub fn page_count(path: &Path) -> std::result::Result<usize, String> {
    let strict_error = match Document::load(path) {
        Ok(doc) => return Ok(doc.get_pages().len()),
        Err(e) => e.to_string(),
    };

    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let Some(buffer) = repaired(&bytes) else {
        return Err(strict_error);
    };

    match Document::load_mem(&buffer) {
        Ok(doc) => {
            ::log::debug!(
                "{} opened after repair ({})",
                path.display(),
                strict_error
            );
            Ok(doc.get_pages().len())
        }
        Err(_) => Err(strict_error),
    }
}

const HEADER: &[u8] = b"%PDF-";
const EOF_MARKER: &[u8] = b"%%EOF";
/// How far from the end the loader looks for the end-of-file marker
const EOF_WINDOW: usize = 512;

/// The document bytes with common damage undone; `None` when there is nothing to repair
fn repaired(bytes: &[u8]) -> Option<Vec<u8>> {
    let start = find(bytes, HEADER)?;
    let mut buffer = bytes[start..].to_vec();

    let tail = buffer.len().saturating_sub(EOF_WINDOW);
    if find(&buffer[tail..], EOF_MARKER).is_none() {
        buffer.extend_from_slice(b"\n%%EOF\n");
    }

    (buffer.as_slice() != bytes).then_some(buffer)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Opens `path` as a document; deletes it when it is unreadable or has no pages
pub fn validate_file(path: &Path) -> Result<ValidationOutcome> {
    let reason = match page_count(path) {
        Ok(0) => "No pages".to_string(),
        Ok(pages) => {
            ::log::debug!("{} has {} pages", path.display(), pages);
            return Ok(ValidationOutcome {
                path: path.to_path_buf(),
                valid: true,
                reason: None,
            });
        }
        Err(e) => e,
    };

    ::log::warn!(
        "{}",
        HarvestError::CorruptDocument {
            path: path.to_path_buf(),
            reason: reason.clone(),
        }
    );
    fs::remove_file(path).map_err(|e| HarvestError::fs(path, e))?;
    ::log::info!("Removed {}", path.display());

    Ok(ValidationOutcome {
        path: path.to_path_buf(),
        valid: false,
        reason: Some(reason),
    })
}

/// Validates every document under `dir`, one file at a time
///
/// A file that cannot be deleted is logged and left out of the result.
pub fn validate_corpus(dir: &Path, extension: &str) -> Result<Vec<ValidationOutcome>> {
    let files = corpus::find_documents(dir, extension)?;
    ::log::info!("Checking {} documents in {}", files.len(), dir.display());

    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        match validate_file(&file) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => ::log::error!("Failed to remove invalid document: {}", e),
        }
    }
    Ok(outcomes)
}
