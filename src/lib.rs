use thiserror::Error;

pub type Result<T> = std::result::Result<T, PdfChatError>;

#[derive(Error, Debug)]
pub enum PdfChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod retrieval;
pub mod server;
