use std::sync::Arc;

use anyhow::Context;
use contarag_chat::Orchestrator;
use contarag_cli::{http::run_server, telemetry::init_tracing};
use contarag_core::config::Config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;
    info!(multi_corpus = settings.retrieval.multi_corpus, "starting chat server");
    // no traffic until every index and model is loaded
    let orchestrator = Orchestrator::from_settings(&settings).await.context("loading resources")?;
    run_server(Arc::new(orchestrator), &settings.server).await
}
