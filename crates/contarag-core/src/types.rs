//! Domain types shared by the indices, the retriever and the chat pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a chunk in the corpus file. Both indices store it.
pub type ChunkId = u64;

/// A contextualized chunk of a source report.
///
/// - `id`: position in the corpus, assigned on load
/// - `source`: corpus label (e.g. `PGC_1990`, `PGC_actual`)
/// - `parent_doc_index`: index of the parent section the chunk was cut from
/// - `original_chunk`: raw text of the child segment
/// - `generated_context`: one-sentence context produced at ingestion
/// - `contextualized_chunk`: context + raw text; the unit that is indexed,
///   retrieved, reranked and shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    #[serde(default)]
    pub id: ChunkId,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub parent_doc_index: usize,
    pub original_chunk: String,
    pub generated_context: String,
    #[serde(default)]
    pub contextualized_chunk: String,
}

impl DocumentChunk {
    /// Joins a generated context and the raw chunk the way ingestion does.
    pub fn contextualize(generated_context: &str, original_chunk: &str) -> String {
        format!("{generated_context}\n\n{original_chunk}")
    }
}

/// Which corpus partition a question should be answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datasource {
    /// The 1990 accounting plan.
    Legacy,
    /// The accounting plan in force (post-2007).
    Actual,
    /// Comparisons or questions spanning both plans.
    Both,
}

impl Datasource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Actual => "actual",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datasource {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "actual" => Ok(Self::Actual),
            "both" => Ok(Self::Both),
            other => Err(crate::error::Error::InvalidInput(format!("unknown datasource '{other}'"))),
        }
    }
}

/// Maps routing labels onto the `source` values stored with each chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLabels {
    pub legacy: String,
    pub actual: String,
}

impl Default for SourceLabels {
    fn default() -> Self {
        Self { legacy: "PGC_1990".to_string(), actual: "PGC_actual".to_string() }
    }
}

impl SourceLabels {
    /// The chunk `source` a datasource restricts to, or `None` for `Both`.
    pub fn filter_for(&self, datasource: Datasource) -> Option<&str> {
        match datasource {
            Datasource::Legacy => Some(&self.legacy),
            Datasource::Actual => Some(&self.actual),
            Datasource::Both => None,
        }
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by both retrieval engines.
///
/// `id` matches `DocumentChunk::id`. `score` is engine-specific but
/// higher is always better; scores of different engines are never compared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "Usuario",
            Self::Assistant => "Asistente",
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
