// Embeddings module
// Ollama-backed embedding client; the model itself is an external collaborator

pub mod ollama;

pub use ollama::{ModelInfo, OllamaClient};
