use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Message, SearchHit};

/// Turns text into fixed-dimension vectors. The dimension must match the
/// one the vector index was built with.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::upstream("embedder", "empty embedding batch"))
    }
}

/// Semantic nearest-neighbour lookup over chunk vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns up to `limit` hits ordered by descending cosine similarity,
    /// restricted to chunks whose source equals `source_filter` when set.
    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>>;
}

/// Sparse term-weighted scoring over the whole corpus.
pub trait LexicalIndex: Send + Sync {
    /// Number of chunks covered by the index.
    fn corpus_len(&self) -> usize;

    /// One score per chunk, aligned to corpus order.
    fn score_all(&self, tokens: &[String]) -> Result<Vec<f32>>;
}

/// Text completion, used both for routing and for answer generation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// With `json_mode` the model is constrained to emit a single JSON object.
    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String>;
}

/// Cross-encoder style relevance scoring of `(query, document)` pairs.
#[async_trait]
pub trait RelevanceModel: Send + Sync {
    async fn score_batch(&self, pairs: &[(String, String)]) -> Result<Vec<f32>>;
}

/// Persisted conversation history keyed by conversation id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Result<Option<Vec<Message>>>;

    /// Appends all `turns` at once; history is never rewritten.
    async fn append(&self, conversation_id: &str, turns: Vec<Message>) -> Result<()>;
}
