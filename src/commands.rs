use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::OllamaClient;
use crate::generation::GeneratorClient;
use crate::ingest::{Ingestor, default_namespace};
use crate::retrieval::Retriever;
use crate::server::{RagPipeline, serve};

/// Ingest a document into the vector index and chunk store
pub async fn ingest_document(file: &Path, namespace: Option<String>) -> Result<()> {
    let config = Config::load()?;
    config.validate().context("Invalid configuration")?;

    let namespace = namespace.unwrap_or_else(|| default_namespace(file));

    println!("Ingesting: {}", file.display());
    println!("Namespace: {}", namespace);

    let mut ingestor = Ingestor::new(config)
        .await
        .context("Failed to initialize ingestion pipeline")?;

    let stats = ingestor
        .ingest_document(file, &namespace)
        .await
        .context("Ingestion failed")?;

    println!("Ingestion completed!");
    println!("  Chunks stored: {}", stats.chunks_created);
    println!("  Embeddings generated: {}", stats.embeddings_generated);
    println!("  Duration: {:?}", stats.duration);
    println!();
    println!("Start chatting with: pdfchat serve --namespace {}", namespace);

    Ok(())
}

/// Start the chat HTTP server
pub async fn serve_chat(
    host: Option<String>,
    port: Option<u16>,
    namespace: Option<String>,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(namespace) = namespace {
        config.retrieval.namespace = namespace;
    }
    config.validate().context("Invalid configuration")?;

    let database = Database::new(config.database_path())
        .await
        .context("Failed to open chunk store")?;

    let vector_store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;
    vector_store
        .wait_until_ready()
        .await
        .context("Vector index did not become ready")?;

    let chunk_count = database.count_chunks(&config.retrieval.namespace).await?;
    if chunk_count == 0 {
        warn!(
            "Namespace '{}' has no chunks; run 'pdfchat ingest' first",
            config.retrieval.namespace
        );
    } else {
        info!(
            "Serving namespace '{}' with {} chunks",
            config.retrieval.namespace, chunk_count
        );
    }

    let ollama_client =
        OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?;
    let generator = GeneratorClient::new(&config.ollama, &config.generation)
        .context("Failed to initialize generation client")?;

    let retriever = Retriever::new(
        Arc::new(ollama_client),
        Arc::new(vector_store),
        database,
        config.retrieval.clone(),
    );

    let pipeline = RagPipeline::new(
        retriever,
        Arc::new(generator),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    serve(&config.server.host, config.server.port, Arc::new(pipeline)).await?;

    Ok(())
}

/// Show the active configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration file: {}", config.config_file_path().display());
    println!("Chunk store: {}", config.database_path().display());
    println!("Vector index: {}", config.vector_database_path().display());
    println!();

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);

    Ok(())
}

/// Show model server and index status
pub async fn show_status() -> Result<()> {
    let config = Config::load()?;
    config.validate().context("Invalid configuration")?;

    println!("Ollama: {}", config.ollama.ollama_url()?);

    let client =
        OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?;
    let embedding_model = config.ollama.embedding_model.clone();
    let generation_model = config.generation.model.clone();

    let probe = tokio::task::spawn_blocking(move || {
        client.ping()?;
        client.list_models()
    })
    .await
    .context("Status probe task failed")?;

    match probe {
        Ok(models) => {
            println!("  Reachable: yes");
            for wanted in [&embedding_model, &generation_model] {
                let available = models.iter().any(|m| &m.name == wanted);
                println!(
                    "  Model {}: {}",
                    wanted,
                    if available { "available" } else { "NOT FOUND" }
                );
            }
        }
        Err(e) => {
            println!("  Reachable: no ({})", e);
        }
    }

    println!();

    let database = Database::new(config.database_path())
        .await
        .context("Failed to open chunk store")?;
    let vector_store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;

    let namespace = &config.retrieval.namespace;
    let chunk_count = database.count_chunks(namespace).await?;
    let vector_count = vector_store.count(namespace).await?;

    println!("Namespace '{}':", namespace);
    println!("  Chunk records: {}", chunk_count);
    println!("  Indexed vectors: {}", vector_count);

    if u64::try_from(chunk_count).unwrap_or_default() != vector_count {
        println!("  Warning: chunk store and vector index disagree; re-run ingestion");
    }

    Ok(())
}
