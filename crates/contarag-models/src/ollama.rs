//! Ollama HTTP clients for embeddings and chat completion.
//!
//! Both talk to the non-streaming endpoints (`/api/embed`, `/api/chat`)
//! with `reqwest`. Any transport failure or non-2xx status surfaces as
//! [`Error::Upstream`]; nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use contarag_core::config::OllamaSettings;
use contarag_core::error::{Error, Result};
use contarag_core::traits::{ChatModel, Embedder};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &OllamaSettings) -> Result<Self> {
        Self::new(settings.base_url.clone(), Duration::from_secs(settings.timeout_secs))
    }

    async fn post<Req: Serialize + ?Sized, Resp: for<'de> Deserialize<'de>>(
        &self,
        service: &str,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            error!(service, url = %url, error = %e, "request failed");
            Error::upstream(service, e)
        })?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text).map(|r| r.error).unwrap_or(text);
            error!(service, status = status.as_u16(), message = %message, "request rejected");
            return Err(Error::upstream(service, format!("HTTP {status}: {message}")));
        }
        response.json::<Resp>().await.map_err(|e| Error::upstream(service, format!("invalid response body: {e}")))
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── Embedder ───────────────────────────────────────────────────────

pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>, dim: usize) -> Self {
        Self { client, model: model.into(), dim }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dim(&self) -> usize { self.dim }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        debug!(model = %self.model, batch_size = texts.len(), "embedding batch");
        let response: EmbedResponse = self
            .client
            .post("embedder", "/api/embed", &EmbedRequest { model: &self.model, input: texts })
            .await?;
        if response.embeddings.len() != texts.len() {
            return Err(Error::upstream(
                "embedder",
                format!("expected {} embeddings, got {}", texts.len(), response.embeddings.len()),
            ));
        }
        if let Some(bad) = response.embeddings.iter().find(|e| e.len() != self.dim) {
            return Err(Error::upstream(
                "embedder",
                format!("model returned dimension {} but the index expects {}", bad.len(), self.dim),
            ));
        }
        Ok(response.embeddings)
    }
}

// ── Chat model ─────────────────────────────────────────────────────

pub struct OllamaChatModel {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaChatModel {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into(), temperature: 0.0 }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), json_mode, "chat completion");
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            stream: false,
            format: json_mode.then_some("json"),
            options: ChatOptions { temperature: self.temperature },
        };
        let response: ChatResponse = self.client.post("chat model", "/api/chat", &request).await?;
        Ok(response.message.content)
    }
}
