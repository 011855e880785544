use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use contarag_core::corpus::Corpus;
use contarag_core::error::{Error, Result};
use contarag_core::traits::{Embedder, LexicalIndex, VectorIndex};
use contarag_core::types::{Datasource, SourceKind, SourceLabels};
use contarag_text::tokenize_query;

pub const DEFAULT_CANDIDATE_LIMIT: usize = 20;

/// A chunk text proposed by one of the engines, with that engine's score.
/// Scores of different engines are never compared with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub score: f32,
    pub source: SourceKind,
}

/// Merges the two candidate lists keyed by text. Vector candidates are
/// inserted first; a lexical candidate only fills a key that is still
/// missing, so a text found by both keeps its vector score and position.
/// Output order is insertion order.
pub fn merge_candidates(vector: Vec<Candidate>, lexical: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(vector.len() + lexical.len());
    for c in vector.into_iter().chain(lexical) {
        if seen.insert(c.text.clone()) {
            merged.push(c);
        }
    }
    merged
}

pub struct HybridRetriever {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    labels: SourceLabels,
}

impl HybridRetriever {
    pub fn new(
        corpus: Arc<Corpus>,
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        labels: SourceLabels,
    ) -> Result<Self> {
        if lexical.corpus_len() != corpus.len() {
            return Err(Error::resource_load(
                "lexical index",
                format!("covers {} chunks but the corpus has {}", lexical.corpus_len(), corpus.len()),
            ));
        }
        Ok(Self { corpus, embedder, vector, lexical, labels })
    }

    /// Merged chunk texts for `question`, vector hits first, then
    /// lexical-only hits. `None` and `Both` search the whole corpus.
    pub async fn retrieve(&self, question: &str, datasource: Option<Datasource>, candidate_limit: usize) -> Result<Vec<String>> {
        let merged = self.retrieve_candidates(question, datasource, candidate_limit).await?;
        Ok(merged.into_iter().map(|c| c.text).collect())
    }

    #[instrument(name = "retrieve", skip(self, question))]
    pub async fn retrieve_candidates(
        &self,
        question: &str,
        datasource: Option<Datasource>,
        candidate_limit: usize,
    ) -> Result<Vec<Candidate>> {
        let filter = datasource.and_then(|d| self.labels.filter_for(d));
        let vector = self.vector_candidates(question, filter, candidate_limit).await?;
        let lexical = self.lexical_candidates(question, filter, candidate_limit)?;
        let (n_vector, n_lexical) = (vector.len(), lexical.len());
        let merged = merge_candidates(vector, lexical);
        debug!(vector = n_vector, lexical = n_lexical, merged = merged.len(), "candidates merged");
        Ok(merged)
    }

    async fn vector_candidates(&self, question: &str, filter: Option<&str>, limit: usize) -> Result<Vec<Candidate>> {
        let query_vector = self.embedder.embed(question).await?;
        let hits = self.vector.search(&query_vector, limit, filter).await?;
        hits.into_iter()
            .map(|h| {
                Ok(Candidate { text: self.corpus.text(h.id)?.to_string(), score: h.score, source: SourceKind::Vector })
            })
            .collect()
    }

    /// Scores the whole corpus, then drops chunks outside `filter`, then
    /// keeps the `limit` best. Equal scores keep corpus order.
    fn lexical_candidates(&self, question: &str, filter: Option<&str>, limit: usize) -> Result<Vec<Candidate>> {
        let tokens = tokenize_query(question);
        let scores = self.lexical.score_all(&tokens)?;
        if scores.len() != self.corpus.len() {
            return Err(Error::upstream(
                "lexical index",
                format!("returned {} scores for {} chunks", scores.len(), self.corpus.len()),
            ));
        }
        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(i, _)| filter.map_or(true, |s| self.corpus.chunks()[*i].source == s))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(limit);
        Ok(ranked
            .into_iter()
            .map(|(i, score)| Candidate {
                text: self.corpus.chunks()[i].contextualized_chunk.clone(),
                score,
                source: SourceKind::Text,
            })
            .collect())
    }
}
