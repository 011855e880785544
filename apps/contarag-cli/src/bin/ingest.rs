use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use contarag_cli::telemetry::init_tracing;
use contarag_core::config::Config;
use contarag_core::corpus::Corpus;
use contarag_models::embedder_from_settings;
use contarag_text::LexicalIndexBuilder;
use contarag_vector::LanceIndexWriter;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut force = false;
    let mut chunks_file = None;
    for arg in &args {
        match arg.as_str() {
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("usage: contarag-ingest [--force] [chunks.json]");
                return Ok(());
            }
            other if !other.starts_with('-') => chunks_file = Some(PathBuf::from(other)),
            other => anyhow::bail!("unknown flag {other}"),
        }
    }
    let chunks_file = chunks_file.unwrap_or_else(|| PathBuf::from(&settings.data.chunks_file));
    let lexical_dir = Path::new(&settings.data.lexical_index_dir);
    let vector_dir = Path::new(&settings.data.vector_index_dir);

    println!("ContaRAG ingestion\n==================");
    let writer = LanceIndexWriter::new(vector_dir, &settings.data.vector_table, settings.embedding.dimension).await?;
    let existing = writer.row_count().await?;
    if existing > 0 && !force && lexical_dir.exists() {
        println!("Table '{}' already holds {} vectors; skipping ingestion (use --force to rebuild).", settings.data.vector_table, existing);
        return Ok(());
    }

    let corpus = Corpus::load(&chunks_file).with_context(|| format!("loading {}", chunks_file.display()))?;
    if corpus.is_empty() {
        println!("No chunks found in {}", chunks_file.display());
        return Ok(());
    }

    let indexed = LexicalIndexBuilder::build(lexical_dir, corpus.chunks())?;
    println!("📊 Indexed {} chunks into the lexical index at {}", indexed, lexical_dir.display());

    if existing > 0 && !force {
        info!(existing, "vector table already populated; only the lexical index was rebuilt");
    } else {
        let embedder = embedder_from_settings(&settings)?;
        let written = writer.index_corpus(corpus.chunks(), embedder.as_ref(), true).await?;
        println!("📊 Embedded and stored {} chunks in LanceDB table '{}'", written, settings.data.vector_table);
    }
    println!("\n✅ Ingestion completed");
    println!("💡 Inspect the vector table with: cargo run --bin contarag-status");
    Ok(())
}
