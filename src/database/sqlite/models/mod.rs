
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted mapping from chunk id to chunk text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChunkRecord {
    pub namespace: String,
    pub chunk_id: String,
    pub seq: i64,
    pub content: String,
    pub source: String,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChunkRecord {
    pub namespace: String,
    pub chunk_id: String,
    pub seq: i64,
    pub content: String,
    pub source: String,
}
