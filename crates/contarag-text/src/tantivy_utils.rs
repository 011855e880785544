use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

use contarag_core::error::{Error, Result};

pub const TOKENIZER_NAME: &str = "whitespace_lower";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _position_field = schema_builder.add_u64_field("position", STORED | FAST);
	let _source_field = schema_builder.add_text_field("source", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	let _text_field = schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

/// Whitespace split + lowercase, mirroring [`tokenize_query`] so that query
/// tokens hit index terms verbatim.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(WhitespaceTokenizer::default())
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

/// Splits a question into lexical query tokens. Only ASCII whitespace
/// separates tokens, as in tantivy's `WhitespaceTokenizer`.
pub fn tokenize_query(question: &str) -> Vec<String> {
	question.to_lowercase().split_ascii_whitespace().map(str::to_string).collect()
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields {
	pub position: Field,
	pub source: Field,
	pub text: Field,
}

impl Fields {
	pub(crate) fn from_schema(schema: &Schema) -> Result<Self> {
		let get = |name: &str| schema.get_field(name).map_err(|e| Error::resource_load("lexical index schema", e));
		Ok(Self { position: get("position")?, source: get("source")?, text: get("text")? })
	}
}
