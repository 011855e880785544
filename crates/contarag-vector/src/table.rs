//! LanceDB connection and housekeeping helpers.
//!
//! Opening a database, checking for the chunk table, counting rows and
//! peeking at a few rows for the status command.

use arrow_array::{Array, RecordBatch, StringArray, UInt64Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, Table};
use std::path::Path;

use contarag_core::error::{Error, Result};

use crate::schema::{ID_COLUMN, SOURCE_COLUMN, TEXT_COLUMN};

pub(crate) const SERVICE: &str = "vector index";

pub(crate) fn lance_err(e: lancedb::Error) -> Error {
	Error::upstream(SERVICE, e)
}

pub async fn open_db(path: &Path) -> Result<Connection> {
	connect(path.to_string_lossy().as_ref())
		.execute()
		.await
		.map_err(|e| Error::resource_load(path.display().to_string(), e))
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	let names = conn.table_names().execute().await.map_err(lance_err)?;
	Ok(names.iter().any(|n| n == name))
}

pub async fn open_table(conn: &Connection, name: &str) -> Result<Option<Table>> {
	if !table_exists(conn, name).await? {
		return Ok(None);
	}
	let table = conn.open_table(name).execute().await.map_err(lance_err)?;
	Ok(Some(table))
}

/// Row count of the table, zero when it does not exist yet.
pub async fn count_rows(conn: &Connection, name: &str) -> Result<usize> {
	match open_table(conn, name).await? {
		Some(table) => table.count_rows(None).await.map_err(lance_err),
		None => Ok(0),
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
	pub id: u64,
	pub source: String,
	pub text: String,
}

/// First `n` rows of the table without their vectors.
pub async fn sample_rows(conn: &Connection, name: &str, n: usize) -> Result<Vec<StoredChunk>> {
	let Some(table) = open_table(conn, name).await? else { return Ok(Vec::new()) };
	let mut stream = table
		.query()
		.select(lancedb::query::Select::columns(&[ID_COLUMN, SOURCE_COLUMN, TEXT_COLUMN]))
		.limit(n)
		.execute()
		.await
		.map_err(lance_err)?;
	let mut rows = Vec::new();
	while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
		rows.extend(stored_chunks(&batch)?);
	}
	rows.truncate(n);
	Ok(rows)
}

fn stored_chunks(batch: &RecordBatch) -> Result<Vec<StoredChunk>> {
	let ids = column::<UInt64Array>(batch, ID_COLUMN)?;
	let sources = column::<StringArray>(batch, SOURCE_COLUMN)?;
	let texts = column::<StringArray>(batch, TEXT_COLUMN)?;
	Ok((0..batch.num_rows())
		.map(|i| StoredChunk { id: ids.value(i), source: sources.value(i).to_string(), text: texts.value(i).to_string() })
		.collect())
}

pub(crate) fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::upstream(SERVICE, format!("column '{name}' missing or mistyped")))
}
