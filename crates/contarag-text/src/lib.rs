//! contarag-text
//!
//! Tantivy-backed BM25 index over the contextualized chunks. The index is
//! built once at ingestion (`index`) and opened read-only at serving time
//! (`search`), where every chunk gets a score for the tokenized question.

pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::LexicalIndexBuilder;
pub use search::LexicalSearchEngine;
pub use tantivy_utils::tokenize_query;
