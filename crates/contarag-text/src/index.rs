use std::path::Path;

use tantivy::{doc, Index, IndexWriter};
use tracing::info;

use contarag_core::error::{Error, Result};
use contarag_core::types::DocumentChunk;

use crate::tantivy_utils::{build_schema, register_tokenizer, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Writes the lexical index for a chunk corpus. Used by ingestion and tests;
/// the serving path only ever opens a finished index.
pub struct LexicalIndexBuilder {
	index: Index,
	fields: Fields,
}

impl LexicalIndexBuilder {
	/// Creates a fresh on-disk index, replacing whatever `index_dir` held.
	pub fn create_in_dir(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir).map_err(op_err)?; }
		std::fs::create_dir_all(index_dir).map_err(op_err)?;
		let index = Index::create_in_dir(index_dir, build_schema()).map_err(op_err)?;
		Self::with_index(index)
	}

	pub fn create_in_ram() -> Result<Self> {
		Self::with_index(Index::create_in_ram(build_schema()))
	}

	fn with_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = Fields::from_schema(&index.schema())?;
		Ok(Self { index, fields })
	}

	/// Adds the chunks in corpus order and commits. Returns the document count.
	pub fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
		let mut index_writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES).map_err(op_err)?;
		for c in chunks {
			let doc = doc!(
				self.fields.position => c.id,
				self.fields.source => c.source.clone(),
				self.fields.text => c.contextualized_chunk.clone(),
			);
			index_writer.add_document(doc).map_err(op_err)?;
		}
		index_writer.commit().map_err(op_err)?;
		info!(documents = chunks.len(), "lexical index committed");
		Ok(chunks.len())
	}

	/// Replaces the index under `index_dir` with one over `chunks`.
	pub fn build(index_dir: &Path, chunks: &[DocumentChunk]) -> Result<usize> {
		Self::create_in_dir(index_dir)?.index_chunks(chunks)
	}

	pub fn into_index(self) -> Index {
		self.index
	}
}

fn op_err(e: impl std::fmt::Display) -> Error {
	Error::Operation(format!("lexical index: {e}"))
}
