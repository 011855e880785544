use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, warn};

use contarag_chat::{ChatRequest, ChatResponse, Orchestrator};
use contarag_core::config::ServerSettings;
use contarag_core::error::Error;

pub fn app_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/chat", post(chat))
        .with_state(orchestrator)
}

pub async fn run_server(orchestrator: Arc<Orchestrator>, server: &ServerSettings) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", server.host, server.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("cannot bind {addr}"))?;
    info!("contarag listening on http://{}", addr);
    axum::serve(listener, app_router(orchestrator)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "Chatbot RAG API is running"}))
}

async fn chat(State(orchestrator): State<Arc<Orchestrator>>, Json(request): Json<ChatRequest>) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(orchestrator.chat(request).await?))
}

/// Maps core errors onto HTTP statuses with a `{"detail": ...}` body.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "chat request failed");
        } else {
            warn!(error = %self.0, "chat request rejected");
        }
        (status, Json(json!({"detail": self.0.to_string()}))).into_response()
    }
}
