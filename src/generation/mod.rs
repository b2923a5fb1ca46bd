
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::{GenerationConfig, OllamaConfig};
use crate::{PdfChatError, Result};

/// Blocking client for the Ollama text generation API.
///
/// Constructed once at startup and shared read-only across requests.
/// Generation can block for seconds; callers on an async runtime must
/// dispatch through a blocking worker and enforce their own request timeout
/// on top of the client-side one here.
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    base_url: Url,
    model: String,
    max_tokens: u32,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl GeneratorClient {
    pub fn new(ollama: &OllamaConfig, generation: &GenerationConfig) -> Result<Self> {
        let base_url = ollama
            .ollama_url()
            .map_err(|e| PdfChatError::Generation(format!("invalid Ollama URL: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(generation.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: generation.model.clone(),
            max_tokens: generation.max_tokens,
            temperature: generation.temperature,
            agent,
        })
    }

    /// Generate text for a prompt within the configured token budget.
    pub fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(PdfChatError::Generation(
                "cannot generate from an empty prompt".to_string(),
            ));
        }

        debug!(
            "Generating response with model {} (prompt length: {}, max tokens: {})",
            self.model,
            prompt.len(),
            self.max_tokens
        );

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let url = self
            .base_url
            .join("/api/generate")
            .map_err(|e| PdfChatError::Generation(format!("failed to build URL: {}", e)))?;

        let request_json = serde_json::to_string(&request)
            .map_err(|e| PdfChatError::Generation(format!("bad generate request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => {
                    warn!("Generation timed out for model {}", self.model);
                    PdfChatError::Generation("model timed out".to_string())
                }
                other => PdfChatError::Generation(format!("model request failed: {}", other)),
            })?;

        let generate_response: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| PdfChatError::Generation(format!("bad generate response: {}", e)))?;

        if generate_response.response.trim().is_empty() {
            return Err(PdfChatError::Generation(
                "model returned an empty response".to_string(),
            ));
        }

        debug!(
            "Generated {} chars of response text",
            generate_response.response.len()
        );

        Ok(generate_response.response)
    }
}
