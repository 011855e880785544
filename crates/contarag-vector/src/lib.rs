//! Semantic vector indices over the chunk corpus.
//!
//! [`LanceVectorIndex`] searches a LanceDB table written by
//! [`LanceIndexWriter`] during ingestion; [`InMemoryVectorIndex`] keeps the
//! vectors in process. Both implement `contarag_core::traits::VectorIndex`.

pub mod inmemory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use inmemory::InMemoryVectorIndex;
pub use search::LanceVectorIndex;
pub use table::{count_rows, open_db, sample_rows, StoredChunk};
pub use writer::{LanceIndexWriter, DEFAULT_BATCH_SIZE};
