
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::Result;
use crate::config::RetrievalConfig;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::OllamaClient;

/// Retrieval path for the serving pipeline.
///
/// Embeds the user query with the same model used at ingestion, looks up the
/// top-k nearest chunk ids in the vector index, resolves each id to its full
/// text through the chunk store, and assembles a bounded context block.
#[derive(Clone)]
pub struct Retriever {
    ollama_client: Arc<OllamaClient>,
    vector_store: Arc<VectorStore>,
    database: Database,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        ollama_client: Arc<OllamaClient>,
        vector_store: Arc<VectorStore>,
        database: Database,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            ollama_client,
            vector_store,
            database,
            config,
        }
    }

    /// Build the context block for a user query. Returns an empty string
    /// when the index has nothing relevant (e.g. an empty namespace).
    pub async fn retrieve_context(&self, query: &str) -> Result<String> {
        let client = Arc::clone(&self.ollama_client);
        let query_text = query.to_string();

        // The embedding client is blocking; keep it off the async workers.
        let query_vector = tokio::task::spawn_blocking(move || client.embed(&query_text))
            .await
            .map_err(|e| crate::PdfChatError::Embedding(format!("embedding task failed: {}", e)))??;

        let hits = self
            .vector_store
            .search(&query_vector, self.config.top_k, &self.config.namespace)
            .await?;

        if hits.is_empty() {
            debug!(
                "No hits in namespace '{}' for query",
                self.config.namespace
            );
            return Ok(String::new());
        }

        let chunk_ids: Vec<String> = hits.iter().map(|h| h.chunk_id.clone()).collect();
        let records = self
            .database
            .get_chunks(&self.config.namespace, &chunk_ids)
            .await?;

        let mut by_id: HashMap<&str, &str> = HashMap::with_capacity(records.len());
        for record in &records {
            by_id.insert(record.chunk_id.as_str(), record.content.as_str());
        }

        // Preserve rank order; a hit without a chunk record means the index
        // and the chunk store have diverged.
        let mut texts = Vec::with_capacity(hits.len());
        for hit in &hits {
            match by_id.get(hit.chunk_id.as_str()) {
                Some(content) => texts.push((*content).to_string()),
                None => warn!(
                    "Chunk {} found in index but missing from chunk store",
                    hit.chunk_id
                ),
            }
        }

        debug!(
            "Retrieved {} context chunks (top similarity {:.3})",
            texts.len(),
            hits[0].similarity_score
        );

        Ok(assemble_context(&texts, self.config.max_context_chars))
    }
}

/// Concatenate retrieved chunk texts into one context block, truncated to
/// `max_chars` characters on a char boundary.
pub fn assemble_context(texts: &[String], max_chars: usize) -> String {
    let mut context = String::new();

    for text in texts {
        if !context.is_empty() {
            context.push_str("\n\n");
        }
        context.push_str(text);
    }

    if context.chars().count() <= max_chars {
        return context;
    }

    context.chars().take(max_chars).collect()
}
