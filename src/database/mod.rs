// Database module
// Dual storage: SQLite for durable chunk text, LanceDB for vectors

pub mod lancedb;
pub mod sqlite;

pub use sqlite::Database;
