use arrow_array::{Float32Array, UInt64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::path::Path;
use tracing::debug;

use contarag_core::error::{Error, Result};
use contarag_core::traits::VectorIndex;
use contarag_core::types::{SearchHit, SourceKind};

use crate::schema::{vector_dimension, DISTANCE_COLUMN, ID_COLUMN};
use crate::table::{self, column, lance_err};

/// Cosine nearest-neighbour search over a prebuilt LanceDB chunk table.
pub struct LanceVectorIndex {
	table: Table,
	dim: usize,
}

impl LanceVectorIndex {
	/// Opens an existing table. A missing database or table, or a table whose
	/// vector width differs from `dim`, is a load error.
	pub async fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let resource = format!("{}#{}", db_path.display(), table_name);
		if !db_path.exists() {
			return Err(Error::resource_load(resource, "vector index directory does not exist"));
		}
		let db = table::open_db(db_path).await?;
		let table = table::open_table(&db, table_name)
			.await?
			.ok_or_else(|| Error::resource_load(resource.clone(), "table not found; run ingestion first"))?;
		let schema = table.schema().await.map_err(|e| Error::resource_load(resource.clone(), e))?;
		match vector_dimension(&schema) {
			Some(stored) if stored == dim => {}
			Some(stored) => {
				return Err(Error::resource_load(
					resource,
					format!("table stores {stored}-d vectors but the embedding dimension is {dim}; re-run ingestion"),
				));
			}
			None => return Err(Error::resource_load(resource, "table has no fixed-size vector column")),
		}
		debug!(table = table_name, dim, "vector index opened");
		Ok(Self { table, dim })
	}

	pub fn dim(&self) -> usize {
		self.dim
	}
}

/// SQL literal for a source label.
fn source_predicate(source: &str) -> String {
	format!("source = '{}'", source.replace('\'', "''"))
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
	async fn search(&self, query_vector: &[f32], limit: usize, source_filter: Option<&str>) -> Result<Vec<SearchHit>> {
		if query_vector.len() != self.dim {
			return Err(Error::InvalidInput(format!(
				"query vector has dimension {}, index expects {}",
				query_vector.len(),
				self.dim
			)));
		}
		if limit == 0 {
			return Ok(Vec::new());
		}
		let mut query = self
			.table
			.vector_search(query_vector.to_vec())
			.map_err(lance_err)?
			.distance_type(DistanceType::Cosine)
			.select(Select::columns(&[ID_COLUMN]))
			.limit(limit);
		if let Some(source) = source_filter {
			query = query.only_if(source_predicate(source));
		}
		let mut stream = query.execute().await.map_err(lance_err)?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
			let ids = column::<UInt64Array>(&batch, ID_COLUMN)?;
			let distances = column::<Float32Array>(&batch, DISTANCE_COLUMN)?;
			for i in 0..batch.num_rows() {
				hits.push(SearchHit { id: ids.value(i), score: 1.0 - distances.value(i), source: SourceKind::Vector });
			}
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(limit);
		debug!(hits = hits.len(), limit, filter = ?source_filter, "vector search");
		Ok(hits)
	}
}
