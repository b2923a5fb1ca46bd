
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::{PdfChatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for the Ollama embeddings API.
///
/// The model is loaded server-side once and stays resident, so this client
/// is cheap to construct but should still be created once per process and
/// shared; embeddings for identical input and model version are
/// deterministic, which keeps reingestion idempotent.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| PdfChatError::Embedding(format!("invalid Ollama URL: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size,
            dimension: config.embedding_dimension as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Test connection to the Ollama server and verify model availability
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping()?;
        self.validate_model()?;

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    pub fn ping(&self) -> Result<()> {
        let url = self.join_url("/api/tags")?;

        debug!("Pinging Ollama server at {}", url);

        self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured embedding model is available
    pub fn validate_model(&self) -> Result<()> {
        debug!("Validating model: {}", self.model);

        let models = self.list_models()?;

        if models.iter().any(|m| m.name == self.model) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(PdfChatError::Embedding(format!(
                "model '{}' is not available; available models: {:?}",
                self.model, available_models
            )))
        }
    }

    /// List all models known to the server
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.join_url("/api/tags")?;

        debug!("Fetching available models from {}", url);

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| PdfChatError::Embedding(format!("bad models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate the embedding vector for a single text input
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(PdfChatError::Embedding(
                "cannot embed empty text".to_string(),
            ));
        }

        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let url = self.join_url("/api/embed")?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| PdfChatError::Embedding(format!("bad embed request: {}", e)))?;

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| PdfChatError::Embedding(format!("bad embed response: {}", e)))?;

        self.check_dimension(&embed_response.embedding)?;

        Ok(embed_response.embedding)
    }

    /// Generate embeddings for multiple text inputs using batch processing
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        // Process in batches to avoid overwhelming the server
        for batch in texts.chunks(self.batch_size as usize) {
            results.extend(self.embed_single_batch(batch)?);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.len() == 1 {
            return Ok(vec![self.embed(&texts[0])?]);
        }

        if let Some(empty) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(PdfChatError::Embedding(format!(
                "cannot embed empty text at batch position {}",
                empty
            )));
        }

        let request = BatchEmbedRequest {
            model: self.model.clone(),
            inputs: texts.to_vec(),
        };

        let url = self.join_url("/api/embed")?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| PdfChatError::Embedding(format!("bad batch embed request: {}", e)))?;

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| PdfChatError::Embedding(format!("bad batch embed response: {}", e)))?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(PdfChatError::Embedding(format!(
                "mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            )));
        }

        for embedding in &batch_response.embeddings {
            self.check_dimension(embedding)?;
        }

        Ok(batch_response.embeddings)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(PdfChatError::Embedding(format!(
                "model returned {}-dimensional vector, expected {}",
                embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    fn join_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PdfChatError::Embedding(format!("failed to build URL {}: {}", path, e)))
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(PdfChatError::Embedding(format!(
                                    "client error: HTTP {}",
                                    status
                                )));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(PdfChatError::Embedding(format!(
                            "non-retryable error: {}",
                            error
                        )));
                    }

                    last_error = Some(PdfChatError::Embedding(format!(
                        "request error: {}",
                        error
                    )));

                    // Wait before retry (exponential backoff)
                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error
            .unwrap_or_else(|| PdfChatError::Embedding("request failed after retries".to_string())))
    }
}
