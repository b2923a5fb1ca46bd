
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{ChunkRecord, NewChunkRecord};

pub struct ChunkQueries;

impl ChunkQueries {
    /// Insert or replace a chunk record.
    ///
    /// Keyed on `(namespace, chunk_id)` so re-running ingestion for the same
    /// document is idempotent.
    pub async fn upsert(pool: &SqlitePool, chunk: &NewChunkRecord) -> Result<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO chunks (namespace, chunk_id, seq, content, source, created_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (namespace, chunk_id)
            DO UPDATE SET seq = excluded.seq,
                          content = excluded.content,
                          source = excluded.source
            "#,
        )
        .bind(&chunk.namespace)
        .bind(&chunk.chunk_id)
        .bind(chunk.seq)
        .bind(&chunk.content)
        .bind(&chunk.source)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to upsert chunk record")?;

        Ok(())
    }

    pub async fn get(
        pool: &SqlitePool,
        namespace: &str,
        chunk_id: &str,
    ) -> Result<Option<ChunkRecord>> {
        let result = sqlx::query_as::<_, ChunkRecord>(
            r#"
            SELECT namespace, chunk_id, seq, content, source, created_date
            FROM chunks
            WHERE namespace = ? AND chunk_id = ?
            "#,
        )
        .bind(namespace)
        .bind(chunk_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get chunk record")?;

        Ok(result)
    }

    /// Fetch several chunk records at once. The result order is unspecified;
    /// callers that care about rank order must reorder by id themselves.
    pub async fn get_many(
        pool: &SqlitePool,
        namespace: &str,
        chunk_ids: &[String],
    ) -> Result<Vec<ChunkRecord>> {
        if chunk_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; chunk_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT namespace, chunk_id, seq, content, source, created_date
            FROM chunks
            WHERE namespace = ? AND chunk_id IN ({})
            "#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, ChunkRecord>(&sql).bind(namespace);
        for chunk_id in chunk_ids {
            query = query.bind(chunk_id);
        }

        let records = query
            .fetch_all(pool)
            .await
            .context("Failed to get chunk records")?;

        debug!(
            "Resolved {}/{} chunk ids from the chunk store",
            records.len(),
            chunk_ids.len()
        );

        Ok(records)
    }

    pub async fn count_for_namespace(pool: &SqlitePool, namespace: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE namespace = ?")
                .bind(namespace)
                .fetch_one(pool)
                .await
                .context("Failed to count chunk records")?;

        Ok(count)
    }

    pub async fn delete_namespace(pool: &SqlitePool, namespace: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE namespace = ?")
            .bind(namespace)
            .execute(pool)
            .await
            .context("Failed to delete namespace chunks")?;

        Ok(result.rows_affected())
    }
}
