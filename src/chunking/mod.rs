
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::{PdfChatError, Result};

/// A contiguous piece of the source document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub content: String,
    /// Position of this chunk within the document
    pub seq: usize,
}

impl Chunk {
    /// Stable identifier used as both the vector index id and the chunk
    /// store key.
    pub fn chunk_id(&self) -> String {
        format!("chunk_{}", self.seq)
    }
}

/// Configuration for text chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Number of characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 25,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size > 100_000 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }

        Ok(())
    }
}

/// Split text into an ordered sequence of overlapping chunks.
///
/// Every chunk after the first starts `chunk_overlap` characters before the
/// end of the previous chunk, so the chunks cover the whole input with no
/// gaps. All chunks except possibly the last are exactly `chunk_size`
/// characters long. Offsets are measured in characters, never raw bytes, so
/// multi-byte input cannot split inside a code point.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config
        .validate()
        .map_err(|e| PdfChatError::Chunking(e.to_string()))?;

    if text.is_empty() {
        return Err(PdfChatError::Chunking(
            "cannot chunk empty text".to_string(),
        ));
    }

    // Byte offset of every char boundary, plus the end of the string.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(total_chars);
        chunks.push(Chunk {
            content: text[boundaries[start]..boundaries[end]].to_string(),
            seq: chunks.len(),
        });

        if end == total_chars {
            break;
        }
        start = end - config.chunk_overlap;
    }

    debug!(
        "Split {} chars into {} chunks (size {}, overlap {})",
        total_chars,
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}
