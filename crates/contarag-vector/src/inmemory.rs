//! In-memory vector index using cosine similarity.
//!
//! Holds every chunk vector in a `Vec` behind a `tokio::sync::RwLock`.
//! Suitable for tests, demos and corpora small enough to embed at startup.

use async_trait::async_trait;
use tokio::sync::RwLock;

use contarag_core::error::{Error, Result};
use contarag_core::traits::{Embedder, VectorIndex};
use contarag_core::types::{ChunkId, DocumentChunk, SearchHit, SourceKind};

use crate::writer::DEFAULT_BATCH_SIZE;

#[derive(Debug, Clone)]
struct Entry {
    id: ChunkId,
    source: String,
    vector: Vec<f32>,
}

#[derive(Debug)]
pub struct InMemoryVectorIndex {
    dim: usize,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: RwLock::new(Vec::new()) }
    }

    /// Embeds every chunk's contextualized text with `embedder`.
    pub async fn from_chunks(chunks: &[DocumentChunk], embedder: &dyn Embedder) -> Result<Self> {
        let index = Self::new(embedder.dim());
        for batch in chunks.chunks(DEFAULT_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.contextualized_chunk.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            for (chunk, vector) in batch.iter().zip(vectors) {
                index.insert(chunk.id, &chunk.source, vector).await?;
            }
        }
        Ok(index)
    }

    pub async fn insert(&self, id: ChunkId, source: &str, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::InvalidInput(format!(
                "vector has dimension {}, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        self.entries.write().await.push(Entry { id, source: source.to_string(), vector });
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(&self, query_vector: &[f32], limit: usize, source_filter: Option<&str>) -> Result<Vec<SearchHit>> {
        if query_vector.len() != self.dim {
            return Err(Error::InvalidInput(format!(
                "query vector has dimension {}, index expects {}",
                query_vector.len(),
                self.dim
            )));
        }
        let entries = self.entries.read().await;
        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter(|e| source_filter.map_or(true, |s| e.source == s))
            .map(|e| SearchHit {
                id: e.id,
                score: cosine_similarity(query_vector, &e.vector),
                source: SourceKind::Vector,
            })
            .collect();
        // stable: ties keep insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn search_filters_by_source_and_orders_by_similarity() {
        let index = InMemoryVectorIndex::new(2);
        index.insert(0, "PGC_1990", vec![1.0, 0.0]).await.unwrap();
        index.insert(1, "PGC_actual", vec![0.9, 0.1]).await.unwrap();
        index.insert(2, "PGC_actual", vec![0.0, 1.0]).await.unwrap();

        let all = index.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(all.iter().map(|h| h.id).collect::<Vec<_>>(), vec![0, 1, 2]);

        let actual = index.search(&[1.0, 0.0], 1, Some("PGC_actual")).await.unwrap();
        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].id, 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_invalid_input() {
        let index = InMemoryVectorIndex::new(3);
        assert!(matches!(index.insert(0, "x", vec![1.0]).await, Err(Error::InvalidInput(_))));
        assert!(matches!(index.search(&[1.0], 1, None).await, Err(Error::InvalidInput(_))));
    }
}
