use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{ChunkRecord, NewChunkRecord};
use crate::database::sqlite::queries::ChunkQueries;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Durable chunk store mapping `(namespace, chunk_id)` to chunk text.
///
/// The vector index holds only chunk ids; the text retrieved at query time
/// always comes from here, so the mapping must survive process restarts.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    // Chunk record operations

    pub async fn upsert_chunk(&self, chunk: &NewChunkRecord) -> Result<()> {
        ChunkQueries::upsert(&self.pool, chunk).await
    }

    pub async fn get_chunk(&self, namespace: &str, chunk_id: &str) -> Result<Option<ChunkRecord>> {
        ChunkQueries::get(&self.pool, namespace, chunk_id).await
    }

    pub async fn get_chunks(&self, namespace: &str, chunk_ids: &[String]) -> Result<Vec<ChunkRecord>> {
        ChunkQueries::get_many(&self.pool, namespace, chunk_ids).await
    }

    pub async fn count_chunks(&self, namespace: &str) -> Result<i64> {
        ChunkQueries::count_for_namespace(&self.pool, namespace).await
    }

    pub async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        ChunkQueries::delete_namespace(&self.pool, namespace).await
    }
}
