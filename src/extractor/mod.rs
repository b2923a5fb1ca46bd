#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{PdfChatError, Result};

/// Raw extracted text for one source document.
///
/// Created once per ingestion run and discarded after chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: PathBuf,
}

/// Extract the full text content of a single document.
///
/// PDF parsing is delegated to `pdf-extract`; plain text and markdown files
/// are read directly. Empty extraction output is fatal — callers must never
/// see a silently empty document.
pub fn extract_text(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(PdfChatError::Extraction(format!(
            "source document not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    debug!("Extracting text from {}", path.display());

    let text = match extension.as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| {
            PdfChatError::Extraction(format!(
                "failed to parse PDF {}: {}",
                path.display(),
                e
            ))
        })?,
        "txt" | "md" => fs::read_to_string(path).map_err(|e| {
            PdfChatError::Extraction(format!("failed to read {}: {}", path.display(), e))
        })?,
        other => {
            return Err(PdfChatError::Extraction(format!(
                "unsupported document type '{}': {}",
                other,
                path.display()
            )));
        }
    };

    if text.trim().is_empty() {
        return Err(PdfChatError::Extraction(format!(
            "no extractable text in {}",
            path.display()
        )));
    }

    info!(
        "Extracted {} chars from {}",
        text.chars().count(),
        path.display()
    );

    Ok(Document {
        text,
        source: path.to_path_buf(),
    })
}
