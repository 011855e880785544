use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt64Array};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::database::CreateTableMode;
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use contarag_core::error::{Error, Result};
use contarag_core::traits::Embedder;
use contarag_core::types::DocumentChunk;

use crate::schema::build_chunk_schema;
use crate::table::{self, lance_err};

/// Chunks embedded and written per round trip, matching the ingestion batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
	Append,
	Overwrite,
}

pub struct LanceIndexWriter {
	db: Connection,
	table_name: String,
	dim: usize,
	batch_size: usize,
}

impl LanceIndexWriter {
	pub async fn new(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		if dim == 0 {
			return Err(Error::InvalidConfig("vector dimension must be > 0".to_string()));
		}
		let db = table::open_db(db_path).await?;
		Ok(Self { db, table_name: table_name.to_string(), dim, batch_size: DEFAULT_BATCH_SIZE })
	}

	pub fn with_batch_size(mut self, batch_size: usize) -> Self {
		self.batch_size = batch_size.max(1);
		self
	}

	pub async fn row_count(&self) -> Result<usize> {
		table::count_rows(&self.db, &self.table_name).await
	}

	/// Embeds every chunk's contextualized text and writes it with its
	/// corpus position. With `replace` the table is recreated with this
	/// writer's schema, otherwise rows are appended.
	pub async fn index_corpus(&self, chunks: &[DocumentChunk], embedder: &dyn Embedder, replace: bool) -> Result<usize> {
		if embedder.dim() != self.dim {
			return Err(Error::InvalidConfig(format!(
				"embedder dimension {} does not match index dimension {}",
				embedder.dim(),
				self.dim
			)));
		}
		if chunks.is_empty() {
			warn!(table = %self.table_name, "no chunks to index");
			if replace {
				let empty = RecordBatch::new_empty(build_chunk_schema(self.dim_i32()?));
				self.write_record_batch(empty, WriteMode::Overwrite).await?;
			}
			return Ok(0);
		}
		info!(chunks = chunks.len(), table = %self.table_name, "indexing chunks into LanceDB");
		let pb = ProgressBar::new(chunks.len() as u64);
		if let Ok(style) = ProgressStyle::default_bar()
			.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
		{
			pb.set_style(style.progress_chars("#>-"));
		}
		let mut written = 0usize;
		let mut mode = if replace { WriteMode::Overwrite } else { WriteMode::Append };
		for batch in chunks.chunks(self.batch_size) {
			let texts: Vec<String> = batch.iter().map(|c| c.contextualized_chunk.clone()).collect();
			let embeddings = embedder.embed_batch(&texts).await?;
			self.check_batch(batch, &embeddings)?;
			self.write_record_batch(self.to_record_batch(batch, &embeddings)?, mode).await?;
			mode = WriteMode::Append;
			written += batch.len();
			pb.set_position(written as u64);
		}
		pb.finish_with_message("done");
		info!(written, table = %self.table_name, "LanceDB indexing completed");
		Ok(written)
	}

	/// Appends pre-computed embeddings aligned with `chunks`, creating the
	/// table on first write.
	pub async fn write_batch(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
		if chunks.is_empty() {
			return Ok(());
		}
		self.check_batch(chunks, embeddings)?;
		self.write_record_batch(self.to_record_batch(chunks, embeddings)?, WriteMode::Append).await
	}

	fn check_batch(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
		if chunks.len() != embeddings.len() {
			return Err(Error::Operation(format!(
				"{} chunks but {} embeddings",
				chunks.len(),
				embeddings.len()
			)));
		}
		Ok(())
	}

	async fn write_record_batch(&self, record_batch: RecordBatch, mode: WriteMode) -> Result<()> {
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		match (mode, table::open_table(&self.db, &self.table_name).await?) {
			(WriteMode::Append, Some(t)) => {
				t.add(reader).execute().await.map_err(lance_err)?;
			}
			(WriteMode::Overwrite, Some(_)) => {
				info!(table = %self.table_name, "recreating table");
				self.db
					.create_table(&self.table_name, reader)
					.mode(CreateTableMode::Overwrite)
					.execute()
					.await
					.map_err(lance_err)?;
			}
			(_, None) => {
				self.db.create_table(&self.table_name, reader).execute().await.map_err(lance_err)?;
			}
		}
		Ok(())
	}

	fn dim_i32(&self) -> Result<i32> {
		i32::try_from(self.dim).map_err(|_| Error::InvalidConfig(format!("dimension {} too large", self.dim)))
	}

	fn to_record_batch(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
		if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim) {
			return Err(Error::Operation(format!("embedding of dimension {} in a {}-d index", bad.len(), self.dim)));
		}
		let dim = self.dim_i32()?;
		let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
		let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
		let texts: Vec<&str> = chunks.iter().map(|c| c.contextualized_chunk.as_str()).collect();
		let vectors = embeddings.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
		RecordBatch::try_new(
			build_chunk_schema(dim),
			vec![
				Arc::new(UInt64Array::from(ids)),
				Arc::new(StringArray::from(sources)),
				Arc::new(StringArray::from(texts)),
				Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
			],
		)
		.map_err(|e| Error::Operation(format!("cannot build record batch: {e}")))
	}
}
