//! Model clients behind the core service traits: Ollama embeddings and chat
//! over HTTP, a hashing embedder for offline use, and a local candle
//! cross-encoder for reranking.

pub mod cross_encoder;
pub mod device;
pub mod hash_embedder;
pub mod ollama;
pub mod tokenize;

use std::sync::Arc;

use tracing::info;

use contarag_core::config::Settings;
use contarag_core::error::Result;
use contarag_core::traits::Embedder;

pub use cross_encoder::CrossEncoder;
pub use hash_embedder::HashEmbedder;
pub use ollama::{OllamaChatModel, OllamaClient, OllamaEmbedder};

/// True when `APP_USE_FAKE_EMBEDDINGS` asks for the hashing embedder.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn embedder_from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let dim = settings.embedding.dimension;
    if use_fake_embeddings() {
        info!(dim, "using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::new(dim)));
    }
    let client = OllamaClient::from_settings(&settings.ollama)?;
    info!(model = %settings.ollama.embedding_model, dim, "using Ollama embedder");
    Ok(Arc::new(OllamaEmbedder::new(client, settings.ollama.embedding_model.clone(), dim)))
}
