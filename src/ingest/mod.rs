#[cfg(test)]
mod tests;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::chunking::{Chunk, split_text};
use crate::config::Config;
use crate::database::lancedb::{VectorRecord, VectorStore};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::NewChunkRecord;
use crate::embeddings::OllamaClient;
use crate::extractor::extract_text;

/// One-shot ingestion pipeline: extract, chunk, embed, index.
///
/// All errors abort the run; there is no partial-success mode. Because every
/// write is keyed by chunk id, an interrupted run can be restarted from
/// scratch and converges to the same index state.
pub struct Ingestor {
    config: Config,
    database: Database,
    vector_store: VectorStore,
    ollama_client: OllamaClient,
}

/// Statistics about a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub chunks_created: usize,
    pub embeddings_generated: usize,
    pub duration: Duration,
}

/// Derive a namespace from the document file name when none is given.
pub fn default_namespace(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default");

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Ingestor {
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::new(config.database_path())
            .await
            .context("Failed to initialize SQLite chunk store")?;

        let vector_store = VectorStore::new(&config)
            .await
            .context("Failed to initialize LanceDB vector store")?;

        vector_store
            .wait_until_ready()
            .await
            .context("Vector index did not become ready")?;

        let ollama_client =
            OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;

        Ok(Self {
            config,
            database,
            vector_store,
            ollama_client,
        })
    }

    /// Ingest a single document into the given namespace.
    pub async fn ingest_document(&mut self, path: &Path, namespace: &str) -> Result<IngestStats> {
        let started = Instant::now();

        info!(
            "Ingesting {} into namespace '{}'",
            path.display(),
            namespace
        );

        let document = extract_text(path)?;
        let chunks = split_text(&document.text, &self.config.chunking)?;
        let source = document.source.to_string_lossy().into_owned();

        info!("Document split into {} chunks", chunks.len());

        let progress = ProgressBar::new(chunks.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} chunks {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let batch_size = self.config.ollama.batch_size as usize;
        let mut embeddings_generated = 0;

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self
                .ollama_client
                .embed_batch(&texts)
                .context("Failed to generate embeddings")?;

            self.store_batch(batch, &embeddings, namespace, &source)
                .await?;

            embeddings_generated += embeddings.len();
            progress.inc(batch.len() as u64);
        }

        progress.finish_with_message("done");

        // Compact after a bulk write; failures here are not fatal.
        if let Err(e) = self.vector_store.optimize().await {
            debug!("Vector store optimization skipped: {}", e);
        }

        let stats = IngestStats {
            chunks_created: chunks.len(),
            embeddings_generated,
            duration: started.elapsed(),
        };

        info!(
            "Ingestion completed: {} chunks, {} embeddings in {:?}",
            stats.chunks_created, stats.embeddings_generated, stats.duration
        );

        Ok(stats)
    }

    async fn store_batch(
        &mut self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
        namespace: &str,
        source: &str,
    ) -> Result<()> {
        let created_at = Utc::now().to_rfc3339();

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| VectorRecord {
                id: chunk.chunk_id(),
                vector: embedding.clone(),
                namespace: namespace.to_string(),
                seq: chunk.seq as u32,
                created_at: created_at.clone(),
            })
            .collect();

        self.vector_store
            .upsert_batch(records)
            .await
            .context("Failed to upsert embeddings into the vector index")?;

        for chunk in chunks {
            self.database
                .upsert_chunk(&NewChunkRecord {
                    namespace: namespace.to_string(),
                    chunk_id: chunk.chunk_id(),
                    seq: chunk.seq as i64,
                    content: chunk.content.clone(),
                    source: source.to_string(),
                })
                .await
                .context("Failed to store chunk record")?;
        }

        debug!("Stored batch of {} chunks", chunks.len());
        Ok(())
    }
}
