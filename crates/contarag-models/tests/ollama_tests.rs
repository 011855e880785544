use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use contarag_core::error::Error;
use contarag_core::traits::{ChatModel, Embedder};
use contarag_models::{OllamaChatModel, OllamaClient, OllamaEmbedder};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

async fn fake_ollama() -> String {
    let app = Router::new()
        .route(
            "/api/embed",
            post(|Json(body): Json<Value>| async move {
                let n = body["input"].as_array().map(Vec::len).unwrap_or(0);
                Json(json!({ "model": body["model"], "embeddings": vec![vec![0.5f32, 0.5, 0.5, 0.5]; n] }))
            }),
        )
        .route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                let content = format!(
                    "format={} temperature={} prompt={}",
                    body["format"],
                    body["options"]["temperature"],
                    body["messages"][0]["content"].as_str().unwrap_or_default()
                );
                Json(json!({ "message": { "role": "assistant", "content": content }, "done": true }))
            }),
        );
    serve(app).await
}

fn client(base_url: &str) -> OllamaClient {
    OllamaClient::new(format!("{base_url}/"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn embed_batch_returns_one_vector_per_text() {
    let url = fake_ollama().await;
    let embedder = OllamaEmbedder::new(client(&url), "nomic-embed-text:latest", 4);
    let out = embedder.embed_batch(&["a".to_string(), "b".to_string()]).await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].len(), 4);
}

#[tokio::test]
async fn embed_dimension_mismatch_is_an_upstream_error() {
    let url = fake_ollama().await;
    let embedder = OllamaEmbedder::new(client(&url), "nomic-embed-text:latest", 768);
    let err = embedder.embed("a").await.unwrap_err();
    assert!(err.is_upstream(), "got {err:?}");
}

#[tokio::test]
async fn chat_sends_json_format_only_in_json_mode() {
    let url = fake_ollama().await;
    let model = OllamaChatModel::new(client(&url), "gpt-oss:20b");
    let plain = model.complete("hola", false).await.unwrap();
    assert_eq!(plain, "format=null temperature=0.0 prompt=hola");
    let json_mode = model.complete("hola", true).await.unwrap();
    assert!(json_mode.starts_with("format=\"json\""), "got {json_mode}");
}

#[tokio::test]
async fn server_errors_surface_as_upstream_failures() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::NOT_FOUND, Json(json!({ "error": "model 'x' not found" }))) }),
    );
    let url = serve(app).await;
    let model = OllamaChatModel::new(client(&url), "x");
    match model.complete("hola", false).await {
        Err(Error::Upstream { message, .. }) => assert!(message.contains("not found"), "{message}"),
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_an_upstream_failure() {
    let model = OllamaChatModel::new(client("http://127.0.0.1:9"), "x");
    assert!(model.complete("hola", false).await.unwrap_err().is_upstream());
}
