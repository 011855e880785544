use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use contarag_core::error::{Error, Result};
use contarag_core::traits::LexicalIndex;

use crate::tantivy_utils::{register_tokenizer, Fields};

/// Read-only BM25 scorer over a prebuilt index.
pub struct LexicalSearchEngine {
	reader: IndexReader,
	fields: Fields,
	corpus_len: usize,
}

impl LexicalSearchEngine {
	/// Opens the index under `index_dir`. Fails when the directory is missing
	/// or the index does not hold exactly `corpus_len` documents.
	pub fn open(index_dir: &Path, corpus_len: usize) -> Result<Self> {
		if !index_dir.exists() {
			return Err(Error::resource_load(index_dir.display().to_string(), "lexical index directory does not exist"));
		}
		let index = Index::open_in_dir(index_dir).map_err(|e| Error::resource_load(index_dir.display().to_string(), e))?;
		Self::from_index(index, corpus_len)
	}

	pub fn from_index(index: Index, corpus_len: usize) -> Result<Self> {
		register_tokenizer(&index);
		let fields = Fields::from_schema(&index.schema())?;
		let reader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e| Error::resource_load("lexical index reader", e))?;
		let engine = Self { reader, fields, corpus_len };
		let num_docs = engine.reader.searcher().num_docs() as usize;
		if num_docs != corpus_len {
			return Err(Error::resource_load(
				"lexical index",
				format!("index holds {num_docs} documents but the corpus has {corpus_len} chunks"),
			));
		}
		Ok(engine)
	}
}

impl LexicalIndex for LexicalSearchEngine {
	fn corpus_len(&self) -> usize { self.corpus_len }

	fn score_all(&self, tokens: &[String]) -> Result<Vec<f32>> {
		let mut scores = vec![0f32; self.corpus_len];
		if tokens.is_empty() || self.corpus_len == 0 { return Ok(scores); }

		let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.fields.text, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let query = BooleanQuery::new(clauses);

		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(self.corpus_len)).map_err(search_err)?;
		debug!(tokens = tokens.len(), matched = top_docs.len(), "lexical scoring");
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(search_err)?;
			let position = doc
				.get_first(self.fields.position)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| Error::upstream("lexical index", "document without position"))?;
			if let Some(slot) = usize::try_from(position).ok().and_then(|p| scores.get_mut(p)) {
				*slot = score;
			}
		}
		Ok(scores)
	}
}

fn search_err(e: tantivy::TantivyError) -> Error {
	Error::upstream("lexical index", e)
}
