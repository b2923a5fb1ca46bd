#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end coverage of the ingestion data path: chunking a document,
// writing both stores, and reading back through the same ids the
// serving path would use. Embeddings are hand-built so no model server
// is required.

use tempfile::TempDir;

use pdfchat::chunking::split_text;
use pdfchat::config::Config;
use pdfchat::database::lancedb::{VectorRecord, VectorStore};
use pdfchat::database::sqlite::Database;
use pdfchat::database::sqlite::models::NewChunkRecord;

const DIMENSION: usize = 8;
const NAMESPACE: &str = "wildlife";

async fn create_test_setup() -> anyhow::Result<(Config, Database, VectorStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.embedding_dimension = DIMENSION as u32;

    let database = Database::new(config.database_path()).await?;
    let vector_store = VectorStore::new(&config).await?;
    vector_store.wait_until_ready().await?;

    Ok((config, database, vector_store, temp_dir))
}

/// Deterministic stand-in embedding so tests need no model server.
fn fake_embedding(seq: usize) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    vector[seq % DIMENSION] = 1.0;
    vector
}

async fn ingest_text(
    text: &str,
    config: &Config,
    database: &Database,
    vector_store: &VectorStore,
) -> anyhow::Result<usize> {
    let chunks = split_text(text, &config.chunking)?;

    let records: Vec<VectorRecord> = chunks
        .iter()
        .map(|chunk| VectorRecord {
            id: chunk.chunk_id(),
            vector: fake_embedding(chunk.seq),
            namespace: NAMESPACE.to_string(),
            seq: chunk.seq as u32,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        })
        .collect();
    vector_store.upsert_batch(records).await?;

    for chunk in &chunks {
        database
            .upsert_chunk(&NewChunkRecord {
                namespace: NAMESPACE.to_string(),
                chunk_id: chunk.chunk_id(),
                seq: chunk.seq as i64,
                content: chunk.content.clone(),
                source: "guide.txt".to_string(),
            })
            .await?;
    }

    Ok(chunks.len())
}

fn document_of_chars(len: usize) -> String {
    "abcdefghij".repeat(len / 10)
}

#[tokio::test]
async fn document_lands_in_both_stores() {
    let (config, database, vector_store, _temp_dir) =
        create_test_setup().await.expect("can create test setup");

    // 1200 chars with 500/25 chunking settles at 3 chunks.
    let text = document_of_chars(1200);
    let chunk_count = ingest_text(&text, &config, &database, &vector_store)
        .await
        .expect("can ingest document");
    assert_eq!(chunk_count, 3);

    assert_eq!(
        vector_store.count(NAMESPACE).await.expect("can count vectors"),
        3
    );
    assert_eq!(
        database
            .count_chunks(NAMESPACE)
            .await
            .expect("can count chunks"),
        3
    );

    // Every indexed id must resolve to stored text through the chunk store.
    for seq in 0i64..3 {
        let chunk_id = format!("chunk_{}", seq);
        let record = database
            .get_chunk(NAMESPACE, &chunk_id)
            .await
            .expect("can query chunk")
            .expect("chunk record should exist");
        assert_eq!(record.seq, seq);
        assert!(!record.content.is_empty());
    }
}

#[tokio::test]
async fn repeated_ingestion_is_idempotent() {
    let (config, database, vector_store, _temp_dir) =
        create_test_setup().await.expect("can create test setup");

    let text = document_of_chars(1200);
    ingest_text(&text, &config, &database, &vector_store)
        .await
        .expect("first ingestion");
    ingest_text(&text, &config, &database, &vector_store)
        .await
        .expect("second ingestion");

    assert_eq!(
        vector_store.count(NAMESPACE).await.expect("can count vectors"),
        3
    );
    assert_eq!(
        database
            .count_chunks(NAMESPACE)
            .await
            .expect("can count chunks"),
        3
    );
}

#[tokio::test]
async fn search_hits_resolve_in_rank_order() {
    let (config, database, vector_store, _temp_dir) =
        create_test_setup().await.expect("can create test setup");

    let text = document_of_chars(1200);
    ingest_text(&text, &config, &database, &vector_store)
        .await
        .expect("can ingest document");

    let hits = vector_store
        .search(&fake_embedding(1), 2, NAMESPACE)
        .await
        .expect("can search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk_id, "chunk_1");

    let ids: Vec<String> = hits.iter().map(|h| h.chunk_id.clone()).collect();
    let records = database
        .get_chunks(NAMESPACE, &ids)
        .await
        .expect("can resolve hits");
    assert_eq!(records.len(), hits.len());
}

#[tokio::test]
async fn chunk_store_survives_reopen() {
    let (config, database, vector_store, _temp_dir) =
        create_test_setup().await.expect("can create test setup");

    let text = document_of_chars(1200);
    ingest_text(&text, &config, &database, &vector_store)
        .await
        .expect("can ingest document");
    drop(database);
    drop(vector_store);

    let database = Database::new(config.database_path())
        .await
        .expect("can reopen chunk store");
    let vector_store = VectorStore::new(&config)
        .await
        .expect("can reopen vector store");

    assert_eq!(
        database
            .count_chunks(NAMESPACE)
            .await
            .expect("can count chunks"),
        3
    );
    assert_eq!(
        vector_store.count(NAMESPACE).await.expect("can count vectors"),
        3
    );
}
