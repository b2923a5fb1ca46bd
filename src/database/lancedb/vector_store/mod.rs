
use super::VectorRecord;
use crate::PdfChatError;
use crate::config::Config;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const READINESS_RETRY_ATTEMPTS: u32 = 10;
const READINESS_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Vector index over chunk embeddings, backed by LanceDB.
///
/// Created with an explicit dimension and queried with cosine similarity.
/// Table creation is idempotent — re-running ingestion against an existing
/// index only upserts.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: String,
    pub seq: u32,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    pub async fn new(config: &Config) -> Result<Self, PdfChatError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PdfChatError::Database(format!(
                    "Failed to create vector database directory: {}",
                    e
                ))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            PdfChatError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        let store = Self {
            connection,
            table_name: "embeddings".to_string(),
            dimension: config.ollama.embedding_dimension as usize,
        };

        store.initialize_table().await?;

        info!(
            "Vector store initialized with dimension {} (cosine)",
            store.dimension
        );
        Ok(store)
    }

    /// Create the embeddings table if it does not exist. Idempotent; an
    /// existing table is only checked for a matching vector dimension.
    async fn initialize_table(&self) -> Result<(), PdfChatError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            let existing = self.detect_existing_vector_dimension().await?;
            if existing != self.dimension {
                return Err(PdfChatError::Database(format!(
                    "existing index has dimension {}, configured dimension is {}",
                    existing, self.dimension
                )));
            }
            debug!("Embeddings table already exists with matching dimension");
            return Ok(());
        }

        info!(
            "Creating embeddings table with dimension {}",
            self.dimension
        );

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    /// Detect vector dimension from the existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, PdfChatError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| {
                PdfChatError::Database(format!("Failed to open existing table: {}", e))
            })?;

        let schema = table
            .schema()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(PdfChatError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("namespace", DataType::Utf8, false),
            Field::new("seq", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Block until the table can be opened, with a bounded retry budget.
    pub async fn wait_until_ready(&self) -> Result<(), PdfChatError> {
        for attempt in 1..=READINESS_RETRY_ATTEMPTS {
            match self.connection.open_table(&self.table_name).execute().await {
                Ok(_) => {
                    debug!("Vector index ready after {} attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Vector index not ready (attempt {}/{}): {}",
                        attempt, READINESS_RETRY_ATTEMPTS, e
                    );
                    tokio::time::sleep(READINESS_RETRY_DELAY).await;
                }
            }
        }

        Err(PdfChatError::IndexUnavailable(format!(
            "index not ready after {} attempts",
            READINESS_RETRY_ATTEMPTS
        )))
    }

    /// Insert or replace entries, keyed by id within a namespace.
    ///
    /// Existing rows with the same ids are deleted first, so re-running
    /// ingestion leaves the index with the same set of distinct ids.
    pub async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), PdfChatError> {
        if records.is_empty() {
            debug!("No embeddings to upsert");
            return Ok(());
        }

        for record in &records {
            if record.vector.len() != self.dimension {
                return Err(PdfChatError::Database(format!(
                    "vector for {} has dimension {}, expected {}",
                    record.id,
                    record.vector.len(),
                    self.dimension
                )));
            }
        }

        debug!("Upserting batch of {} embeddings", records.len());

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {}", e)))?;

        // Ids are only unique within a namespace, so stale rows are removed
        // per namespace even for a mixed batch.
        let mut ids_by_namespace: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for record in &records {
            ids_by_namespace
                .entry(record.namespace.as_str())
                .or_default()
                .push(format!("'{}'", escape_literal(&record.id)));
        }

        for (namespace, ids) in ids_by_namespace {
            let predicate = format!(
                "namespace = '{}' AND id IN ({})",
                escape_literal(namespace),
                ids.join(", ")
            );
            table.delete(&predicate).await.map_err(|e| {
                PdfChatError::Database(format!("Failed to delete existing entries: {}", e))
            })?;
        }

        let record_batch = self.create_record_batch(&records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Upserted {} embeddings", records.len());
        Ok(())
    }

    fn create_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch, PdfChatError> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut namespaces = Vec::with_capacity(len);
        let mut seqs = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for record in records {
            ids.push(record.id.as_str());
            namespaces.push(record.namespace.as_str());
            seqs.push(record.seq);
            created_ats.push(record.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| PdfChatError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(namespaces)),
            Arc::new(UInt32Array::from(seqs)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| PdfChatError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Return at most `limit` nearest entries by cosine similarity within a
    /// namespace, best match first.
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        namespace: &str,
    ) -> Result<Vec<SearchHit>, PdfChatError> {
        if query_vector.len() != self.dimension {
            return Err(PdfChatError::Database(format!(
                "query vector has dimension {}, expected {}",
                query_vector.len(),
                self.dimension
            )));
        }

        debug!(
            "Searching namespace '{}' for {} nearest vectors",
            namespace, limit
        );

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| PdfChatError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .only_if(format!("namespace = '{}'", escape_literal(namespace)))
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchHit>, PdfChatError> {
        let mut search_hits = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_hits.extend(self.parse_search_batch(&batch_result)?);
        }

        // Nearest first regardless of batch boundaries.
        search_hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        debug!("Parsed {} search hits from stream", search_hits.len());
        Ok(search_hits)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<SearchHit>, PdfChatError> {
        let mut search_hits = Vec::new();
        let num_rows = batch.num_rows();

        let ids = batch
            .column_by_name("id")
            .ok_or_else(|| PdfChatError::Database("Missing id column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| PdfChatError::Database("Invalid id column type".to_string()))?;

        let seqs = batch
            .column_by_name("seq")
            .ok_or_else(|| PdfChatError::Database("Missing seq column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| PdfChatError::Database("Invalid seq column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        for row in 0..num_rows {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            // Convert cosine distance to similarity score (higher is better)
            let similarity_score = 1.0 - distance;

            search_hits.push(SearchHit {
                chunk_id: ids.value(row).to_string(),
                seq: seqs.value(row),
                similarity_score,
                distance,
            });
        }

        Ok(search_hits)
    }

    /// Total number of entries stored for a namespace
    pub async fn count(&self, namespace: &str) -> Result<u64, PdfChatError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(Some(format!(
                "namespace = '{}'",
                escape_literal(namespace)
            )))
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Compact and reorganize the index after a large ingest
    pub async fn optimize(&self) -> Result<(), PdfChatError> {
        debug!("Optimizing vector database");

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {}", e)))?;

        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to optimize table: {}", e)))?;

        info!("Vector database optimization completed");
        Ok(())
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
