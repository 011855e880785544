use std::sync::Arc;

use tracing::{debug, instrument};

use contarag_core::error::{Error, Result};
use contarag_core::traits::RelevanceModel;

pub const DEFAULT_TOP_K: usize = 5;

/// Orders `candidates` by descending score and keeps the first `k`.
/// Equal scores keep their input order; NaN ranks last.
pub fn rank_by_scores(candidates: Vec<String>, scores: &[f32], k: usize) -> Vec<(String, f32)> {
    let mut scored: Vec<(String, f32)> = candidates
        .into_iter()
        .zip(scores.iter().map(|s| if s.is_nan() { f32::NEG_INFINITY } else { *s }))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

pub struct Reranker {
    model: Arc<dyn RelevanceModel>,
    top_k: usize,
}

impl Reranker {
    pub fn new(model: Arc<dyn RelevanceModel>, top_k: usize) -> Self {
        Self { model, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The `top_k` most relevant candidates, best first.
    pub async fn rerank(&self, question: &str, candidates: Vec<String>) -> Result<Vec<String>> {
        Ok(self.rerank_scored(question, candidates).await?.into_iter().map(|(text, _)| text).collect())
    }

    /// Like [`Reranker::rerank`] but keeps the relevance scores.
    #[instrument(name = "rerank", skip_all, fields(candidates = candidates.len(), top_k = self.top_k))]
    pub async fn rerank_scored(&self, question: &str, candidates: Vec<String>) -> Result<Vec<(String, f32)>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let pairs: Vec<(String, String)> = candidates.iter().map(|c| (question.to_string(), c.clone())).collect();
        let scores = self.model.score_batch(&pairs).await?;
        if scores.len() != candidates.len() {
            return Err(Error::upstream(
                "relevance model",
                format!("returned {} scores for {} pairs", scores.len(), candidates.len()),
            ));
        }
        let ranked = rank_by_scores(candidates, &scores, self.top_k);
        debug!(kept = ranked.len(), best = ranked.first().map(|(_, s)| *s), "reranked");
        Ok(ranked)
    }
}
