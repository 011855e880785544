use std::path::Path;

use contarag_cli::telemetry::init_tracing;
use contarag_core::config::Config;
use contarag_vector::{count_rows, open_db, sample_rows};

const SAMPLE_ROWS: usize = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;
    let db_path = Path::new(&settings.data.vector_index_dir);
    let table = &settings.data.vector_table;

    let db = open_db(db_path).await?;
    let count = count_rows(&db, table).await?;
    println!("Vector index at {}", db_path.display());
    println!("- table '{}': {} rows", table, count);
    if count == 0 {
        println!("\nThe table is empty or does not exist. Run contarag-ingest first.");
        return Ok(());
    }

    println!("\n--- {} sample rows ---", SAMPLE_ROWS);
    for (i, row) in sample_rows(&db, table, SAMPLE_ROWS).await?.iter().enumerate() {
        println!("\n--- Sample {} ---", i + 1);
        println!("id: {}", row.id);
        println!("source: {}", row.source);
        println!("text: {}", row.text);
    }
    Ok(())
}
