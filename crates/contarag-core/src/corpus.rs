//! The contextualized chunk corpus produced by offline ingestion.
//!
//! Chunks are read once at startup from a JSON array and never mutated.
//! A chunk's position in that array is its `ChunkId` in both indices.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::{ChunkId, DocumentChunk};

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<DocumentChunk>,
}

impl Corpus {
    /// Builds a corpus from chunks in their final order, reassigning ids to
    /// positions and filling in missing contextualized text.
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(position, mut chunk)| {
                chunk.id = position as ChunkId;
                if chunk.contextualized_chunk.is_empty() {
                    chunk.contextualized_chunk =
                        DocumentChunk::contextualize(&chunk.generated_context, &chunk.original_chunk);
                }
                chunk
            })
            .collect();
        Self { chunks }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::resource_load(path.display().to_string(), e))?;
        Self::from_json(&raw).map_err(|e| match e {
            Error::ResourceLoad { message, .. } => Error::resource_load(path.display().to_string(), message),
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let chunks: Vec<DocumentChunk> =
            serde_json::from_str(raw).map_err(|e| Error::resource_load("chunk corpus", e))?;
        let corpus = Self::new(chunks);
        info!(chunks = corpus.len(), sources = ?corpus.source_counts(), "loaded chunk corpus");
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: ChunkId) -> Option<&DocumentChunk> {
        usize::try_from(id).ok().and_then(|i| self.chunks.get(i))
    }

    /// The contextualized text of a chunk, or `NotFound` for ids the corpus
    /// does not know (an index built from a different corpus).
    pub fn text(&self, id: ChunkId) -> Result<&str> {
        self.get(id)
            .map(|c| c.contextualized_chunk.as_str())
            .ok_or_else(|| Error::NotFound(format!("chunk {id} is not in the corpus")))
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn source_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.chunks {
            *counts.entry(c.source.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
