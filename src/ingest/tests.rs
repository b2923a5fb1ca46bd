use super::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

#[test]
fn namespace_from_simple_file_name() {
    assert_eq!(default_namespace(Path::new("data/guide.pdf")), "guide");
}

#[test]
fn namespace_is_sanitized() {
    let path = PathBuf::from("data/Kingdon Field Guide (2nd ed.).pdf");
    let namespace = default_namespace(&path);
    assert!(namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    assert!(!namespace.starts_with('-'));
    assert!(!namespace.ends_with('-'));
}

#[test]
fn namespace_falls_back_to_default() {
    assert_eq!(default_namespace(Path::new("...")), "default");
}

#[tokio::test]
async fn ingestor_initializes_stores() {
    let (config, _temp_dir) = create_test_config();

    let result = Ingestor::new(config).await;
    assert!(
        result.is_ok(),
        "Should create ingestor: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn missing_document_aborts_the_run() {
    let (config, _temp_dir) = create_test_config();
    let mut ingestor = Ingestor::new(config).await.expect("should create ingestor");

    let result = ingestor
        .ingest_document(Path::new("/nonexistent/guide.pdf"), "wildlife")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn degenerate_chunking_config_aborts_the_run() {
    let (mut config, temp_dir) = create_test_config();
    config.chunking.chunk_size = 10;
    config.chunking.chunk_overlap = 10;

    let doc_path = temp_dir.path().join("doc.txt");
    std::fs::write(&doc_path, "some document text").expect("should write file");

    let mut ingestor = Ingestor::new(config).await.expect("should create ingestor");
    let result = ingestor.ingest_document(&doc_path, "wildlife").await;
    assert!(result.is_err());
}
