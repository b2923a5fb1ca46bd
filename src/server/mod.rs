#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::generation::GeneratorClient;
use crate::retrieval::Retriever;
use crate::{PdfChatError, Result};

const CHAT_PAGE: &str = include_str!("../../assets/chat.html");

const PROMPT_TEMPLATE: &str = "Use the following pieces of information to answer the user's question.\n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
Context: {context}\n\
Question: {question}\n\n\
Only return the helpful answer below and nothing else.\n\
Helpful answer:";

/// Answers a single chat message. The production implementation runs
/// retrieval then generation; tests substitute their own.
#[async_trait]
pub trait ChatPipeline: Send + Sync {
    async fn answer(&self, message: &str) -> Result<String>;
}

/// Retrieval-augmented pipeline backed by the vector index and Ollama.
pub struct RagPipeline {
    retriever: Retriever,
    generator: Arc<GeneratorClient>,
    request_timeout: Duration,
}

impl RagPipeline {
    pub fn new(
        retriever: Retriever,
        generator: Arc<GeneratorClient>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            generator,
            request_timeout,
        }
    }
}

/// Render the generation prompt from the retrieved context and the question.
pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

#[async_trait]
impl ChatPipeline for RagPipeline {
    async fn answer(&self, message: &str) -> Result<String> {
        let context = self.retriever.retrieve_context(message).await?;
        debug!("Assembled {} chars of context", context.chars().count());

        let prompt = build_prompt(&context, message);
        let generator = Arc::clone(&self.generator);

        // The generator client is blocking; run it off the async workers
        // under the per-request budget.
        let generation = tokio::task::spawn_blocking(move || generator.generate(&prompt));

        match tokio::time::timeout(self.request_timeout, generation).await {
            Ok(joined) => joined
                .map_err(|e| PdfChatError::Generation(format!("generation task failed: {}", e)))?,
            Err(_) => Err(PdfChatError::Generation(format!(
                "request exceeded the {}s budget",
                self.request_timeout.as_secs()
            ))),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<dyn ChatPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<dyn ChatPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Error wrapper so handlers can use `?` and still return JSON bodies.
struct ChatResponseError {
    status: StatusCode,
    message: String,
}

impl From<PdfChatError> for ChatResponseError {
    fn from(err: PdfChatError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ChatResponseError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    msg: String,
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn chat_message(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> std::result::Result<String, ChatResponseError> {
    let message = form.msg.trim();
    if message.is_empty() {
        return Err(ChatResponseError {
            status: StatusCode::BAD_REQUEST,
            message: "message cannot be empty".to_string(),
        });
    }

    debug!("Chat request: {} chars", message.chars().count());

    let answer = state.pipeline.answer(message).await.inspect_err(|e| {
        error!("Chat request failed: {}", e);
    })?;

    Ok(answer)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/get", post(chat_message))
        .with_state(state)
}

/// Bind and serve the chat application until the process is stopped.
pub async fn serve(host: &str, port: u16, pipeline: Arc<dyn ChatPipeline>) -> Result<()> {
    let router = build_router(AppState::new(pipeline));

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Chat server listening on http://{}", addr);

    axum::serve(listener, router)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
