use super::*;
use crate::config::{Config, OllamaConfig};
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::OllamaClient;
use axum::body::Body;
use axum::http::{Request, header};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedPipeline {
    reply: String,
}

#[async_trait]
impl ChatPipeline for FixedPipeline {
    async fn answer(&self, _message: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}

struct FailingPipeline;

#[async_trait]
impl ChatPipeline for FailingPipeline {
    async fn answer(&self, _message: &str) -> Result<String> {
        Err(PdfChatError::Generation("model timed out".to_string()))
    }
}

fn test_router(pipeline: Arc<dyn ChatPipeline>) -> Router {
    build_router(AppState::new(pipeline))
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("should read body");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

fn chat_request(msg: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/get")
        .header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(format!(
            "msg={}",
            url::form_urlencoded::byte_serialize(msg.as_bytes()).collect::<String>()
        )))
        .expect("should build request")
}

#[test]
fn prompt_embeds_context_and_question() {
    let prompt = build_prompt("Lions live in prides.", "Where do lions live?");
    assert!(prompt.contains("Context: Lions live in prides."));
    assert!(prompt.contains("Question: Where do lions live?"));
    assert!(!prompt.contains("{context}"));
    assert!(!prompt.contains("{question}"));
}

#[tokio::test]
async fn index_serves_chat_page() {
    let router = test_router(Arc::new(FixedPipeline {
        reply: "hi".to_string(),
    }));

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
        .await
        .expect("should get response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("<form"));
}

#[tokio::test]
async fn chat_returns_pipeline_answer() {
    let router = test_router(Arc::new(FixedPipeline {
        reply: "Lions live in prides.".to_string(),
    }));

    let response = router
        .oneshot(chat_request("Where do lions live?"))
        .await
        .expect("should get response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Lions live in prides.");
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let router = test_router(Arc::new(FixedPipeline {
        reply: "unused".to_string(),
    }));

    let response = router
        .oneshot(chat_request("   "))
        .await
        .expect("should get response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("should be JSON");
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn request_budget_cuts_off_slow_generation() {
    let server = MockServer::start().await;

    // Embedding answers immediately; generation stalls past the per-request
    // budget but within the generator client's own timeout.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": [1.0, 0.0, 0.0, 0.0, 0.0]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_json(json!({
                    "response": "too late",
                    "done": true
                })),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama = OllamaConfig {
        protocol: "http".to_string(),
        host: "127.0.0.1".to_string(),
        port: server.address().port(),
        embedding_dimension: 5,
        ..OllamaConfig::default()
    };
    config.generation.timeout_secs = 30;

    let database = Database::new(config.database_path())
        .await
        .expect("should create database");
    let vector_store = VectorStore::new(&config)
        .await
        .expect("should create vector store");
    let ollama_client = OllamaClient::new(&config.ollama).expect("should create client");
    let generator =
        GeneratorClient::new(&config.ollama, &config.generation).expect("should create generator");

    let retriever = Retriever::new(
        Arc::new(ollama_client),
        Arc::new(vector_store),
        database,
        config.retrieval.clone(),
    );
    let pipeline = RagPipeline::new(retriever, Arc::new(generator), Duration::from_secs(1));

    let result = pipeline.answer("where do lions live?").await;
    let err = result.expect_err("slow generation should be cut off");
    assert!(matches!(err, PdfChatError::Generation(_)));
    assert!(err.to_string().contains("budget"));
}

#[tokio::test]
async fn pipeline_failure_maps_to_json_error() {
    let router = test_router(Arc::new(FailingPipeline));

    let response = router
        .oneshot(chat_request("anything"))
        .await
        .expect("should get response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("should be JSON");
    assert_eq!(body["error"], "Generation error: model timed out");
}
