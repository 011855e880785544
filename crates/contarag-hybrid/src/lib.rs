//! Candidate retrieval over both indices and cross-encoder reranking.
//!
//! [`HybridRetriever`] merges semantic and lexical candidates keyed by chunk
//! text; [`Reranker`] is the only place their final order is decided.

pub mod reranker;
pub mod retriever;

pub use reranker::{rank_by_scores, Reranker, DEFAULT_TOP_K};
pub use retriever::{merge_candidates, Candidate, HybridRetriever, DEFAULT_CANDIDATE_LIMIT};
