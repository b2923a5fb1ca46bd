// LanceDB vector index module
// Stores chunk embeddings keyed by chunk id; similarity search at query time

pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{SearchHit, VectorStore};

/// Entry written to the vector index.
///
/// The id is the chunk id itself — the same identifier keys the chunk store,
/// so there is no separate vector-id space to reconcile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub namespace: String,
    pub seq: u32,
    pub created_at: String,
}
