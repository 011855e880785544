use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use contarag_core::config::Settings;
use contarag_core::corpus::Corpus;
use contarag_core::error::Result;
use contarag_core::traits::{ChatModel, Embedder, LexicalIndex, RelevanceModel, VectorIndex};
use contarag_hybrid::{HybridRetriever, Reranker};
use contarag_models::{embedder_from_settings, CrossEncoder, OllamaChatModel, OllamaClient};
use contarag_text::LexicalSearchEngine;
use contarag_vector::LanceVectorIndex;

use crate::generator::AnswerGenerator;
use crate::router::Router;

/// Every collaborator a turn needs, built once and shared read-only by
/// all conversations.
pub struct Resources {
    pub router: Router,
    pub retriever: HybridRetriever,
    pub reranker: Reranker,
    pub generator: AnswerGenerator,
    pub candidate_limit: usize,
}

/// The raw services, for assembling [`Resources`] from test doubles.
pub struct Services {
    pub corpus: Arc<Corpus>,
    pub embedder: Arc<dyn Embedder>,
    pub vector: Arc<dyn VectorIndex>,
    pub lexical: Arc<dyn LexicalIndex>,
    pub relevance: Arc<dyn RelevanceModel>,
    pub router_model: Arc<dyn ChatModel>,
    pub generation_model: Arc<dyn ChatModel>,
}

impl Resources {
    pub fn new(services: Services, settings: &Settings) -> Result<Self> {
        let retrieval = &settings.retrieval;
        let retriever = HybridRetriever::new(
            services.corpus,
            services.embedder,
            services.vector,
            services.lexical,
            retrieval.source_labels(),
        )?;
        Ok(Self {
            router: Router::new(services.router_model, retrieval.default_datasource),
            retriever,
            reranker: Reranker::new(services.relevance, settings.reranker.top_k),
            generator: AnswerGenerator::new(services.generation_model),
            candidate_limit: retrieval.candidate_limit,
        })
    }

    /// Loads the corpus, both prebuilt indices and the models. Any missing
    /// resource is a `ResourceLoad` error.
    pub async fn load(settings: &Settings) -> Result<Self> {
        let start = Instant::now();
        let corpus = Arc::new(Corpus::load(Path::new(&settings.data.chunks_file))?);
        let lexical = LexicalSearchEngine::open(Path::new(&settings.data.lexical_index_dir), corpus.len())?;
        let vector = LanceVectorIndex::open(
            Path::new(&settings.data.vector_index_dir),
            &settings.data.vector_table,
            settings.embedding.dimension,
        )
        .await?;
        let embedder = embedder_from_settings(settings)?;
        let relevance = CrossEncoder::load(Path::new(&settings.reranker.model_dir), settings.reranker.max_length)?;

        let client = OllamaClient::from_settings(&settings.ollama)?;
        let router_model = OllamaChatModel::new(client.clone(), settings.ollama.router_model.clone());
        let generation_model = OllamaChatModel::new(client, settings.ollama.generation_model.clone());

        let resources = Self::new(
            Services {
                corpus,
                embedder,
                vector: Arc::new(vector),
                lexical: Arc::new(lexical),
                relevance: Arc::new(relevance),
                router_model: Arc::new(router_model),
                generation_model: Arc::new(generation_model),
            },
            settings,
        )?;
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "resources loaded");
        Ok(resources)
    }
}
