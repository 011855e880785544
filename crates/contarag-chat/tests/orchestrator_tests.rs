use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use contarag_chat::resources::Services;
use contarag_chat::{
    ChatRequest, FileSessionStore, InMemorySessionStore, Orchestrator, PipelineMode, Resources, TurnState,
    NO_DOCUMENTS_RESPONSE,
};
use contarag_core::config::Settings;
use contarag_core::corpus::Corpus;
use contarag_core::error::{Error, Result};
use contarag_core::traits::{ChatModel, RelevanceModel, SessionStore};
use contarag_core::types::{Datasource, DocumentChunk, Role};
use contarag_models::HashEmbedder;
use contarag_text::{LexicalIndexBuilder, LexicalSearchEngine};
use contarag_vector::InMemoryVectorIndex;

const QUESTION: &str = "¿cuáles son las cuentas de Capital?";

/// Replies with a fixed text and counts calls.
struct FixedModel {
    reply: String,
    calls: AtomicUsize,
}

impl FixedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.to_string(), calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl ChatModel for FixedModel {
    async fn complete(&self, _prompt: &str, _json_mode: bool) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Answers with the prompt it was given.
struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, prompt: &str, _json_mode: bool) -> Result<String> {
        Ok(prompt.to_string())
    }
}

struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn complete(&self, _prompt: &str, _json_mode: bool) -> Result<String> {
        Err(Error::upstream("chat model", "HTTP 500 Internal Server Error"))
    }
}

/// Scores a document by how many question words it contains.
#[derive(Default)]
struct OverlapModel {
    calls: AtomicUsize,
}

#[async_trait]
impl RelevanceModel for OverlapModel {
    async fn score_batch(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(pairs
            .iter()
            .map(|(q, d)| {
                let d = d.to_lowercase();
                q.to_lowercase().split_whitespace().filter(|w| d.contains(w)).count() as f32
            })
            .collect())
    }
}

fn chunk(source: &str, context: &str, text: &str) -> DocumentChunk {
    DocumentChunk {
        id: 0,
        source: source.to_string(),
        parent_doc_index: 0,
        original_chunk: text.to_string(),
        generated_context: context.to_string(),
        contextualized_chunk: String::new(),
    }
}

fn sample_corpus() -> Corpus {
    Corpus::new(vec![
        chunk("PGC_actual", "Cuentas de capital del plan vigente.", "100 Capital social. 102 Capital."),
        chunk("PGC_actual", "Existencias.", "Las existencias se valoran al coste de adquisición."),
        chunk("PGC_1990", "Cuentas de capital del plan de 1990.", "100 Capital social. 101 Fondo social."),
        chunk("PGC_actual", "Ingresos.", "Reconocimiento de ingresos ordinarios."),
        chunk("PGC_actual", "Amortización.", "Amortización del inmovilizado material."),
        chunk("PGC_actual", "Provisiones.", "Provisiones a largo plazo."),
        chunk("PGC_actual", "Arrendamientos.", "Arrendamientos financieros y operativos."),
    ])
}

async fn resources(
    corpus: Corpus,
    router: Arc<dyn ChatModel>,
    generator: Arc<dyn ChatModel>,
    relevance: Arc<dyn RelevanceModel>,
) -> Arc<Resources> {
    let corpus = Arc::new(corpus);
    let embedder = HashEmbedder::new(64);
    let vector = InMemoryVectorIndex::from_chunks(corpus.chunks(), &embedder).await.expect("vector index");
    let builder = LexicalIndexBuilder::create_in_ram().expect("ram index");
    builder.index_chunks(corpus.chunks()).expect("lexical index");
    let lexical = LexicalSearchEngine::from_index(builder.into_index(), corpus.len()).expect("lexical engine");
    let services = Services {
        corpus,
        embedder: Arc::new(embedder),
        vector: Arc::new(vector),
        lexical: Arc::new(lexical),
        relevance,
        router_model: router,
        generation_model: generator,
    };
    Arc::new(Resources::new(services, &Settings::default()).expect("resources"))
}

fn request(text: &str, id: Option<&str>) -> ChatRequest {
    ChatRequest { user_input: text.to_string(), conversation_id: id.map(str::to_string) }
}

#[tokio::test]
async fn new_conversation_gets_an_id_and_one_exchange() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let res = resources(
        sample_corpus(),
        FixedModel::new(r#"{"datasource": "actual"}"#),
        FixedModel::new("Las cuentas 100 y 102."),
        Arc::new(OverlapModel::default()),
    )
    .await;
    let orchestrator = Orchestrator::new(res, sessions.clone(), PipelineMode::MultiCorpus);

    let response = orchestrator.chat(request(QUESTION, None)).await.expect("chat");
    assert_eq!(response.assistant_response, "Las cuentas 100 y 102.");
    assert!(!response.conversation_id.is_empty());

    let history = sessions.load(&response.conversation_id).await.unwrap().expect("session");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, QUESTION);
    assert_eq!(history[1].role, Role::Assistant);

    let other = orchestrator.chat(request(QUESTION, None)).await.unwrap();
    assert_ne!(other.conversation_id, response.conversation_id);
}

#[tokio::test]
async fn second_turn_sees_first_exchange_in_prompt() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let res = resources(
        sample_corpus(),
        FixedModel::new(r#"{"datasource": "both"}"#),
        Arc::new(EchoModel),
        Arc::new(OverlapModel::default()),
    )
    .await;
    let orchestrator = Orchestrator::new(res, sessions.clone(), PipelineMode::MultiCorpus);

    let first = orchestrator.chat(request(QUESTION, None)).await.unwrap();
    let second = orchestrator
        .chat(request("¿y en el plan de 1990?", Some(&first.conversation_id)))
        .await
        .unwrap();

    assert_eq!(second.conversation_id, first.conversation_id);
    assert!(second.assistant_response.contains(&format!("Usuario: {QUESTION}")));
    assert!(second.assistant_response.contains(&format!("Asistente: {}", first.assistant_response)));
    assert_eq!(sessions.load(&first.conversation_id).await.unwrap().unwrap().len(), 4);
}

#[tokio::test]
async fn empty_retrieval_answers_with_fallback_text() {
    let relevance = Arc::new(OverlapModel::default());
    let generator = FixedModel::new("should not be called");
    let res = resources(Corpus::default(), FixedModel::new("no json"), generator.clone(), relevance.clone()).await;
    let orchestrator = Orchestrator::new(res, Arc::new(InMemorySessionStore::new()), PipelineMode::MultiCorpus);

    let data = orchestrator.run_turn(QUESTION, Vec::new()).await.unwrap();
    assert_eq!(data.assistant_response(), Some(NO_DOCUMENTS_RESPONSE));
    assert_eq!(
        data.trace,
        vec![
            TurnState::Start,
            TurnState::Route,
            TurnState::Retrieve,
            TurnState::Rerank,
            TurnState::HandleNoDocuments,
            TurnState::End
        ]
    );
    assert_eq!(relevance.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let response = orchestrator.chat(request(QUESTION, None)).await.unwrap();
    assert_eq!(
        response.assistant_response,
        "Lo siento, no he podido encontrar información relevante para responder a tu pregunta."
    );
}

#[tokio::test]
async fn unparseable_route_defaults_to_actual() {
    for reply in [r#"{"datasource": "bogus"}"#, r#"not json {"datasource": "legacy"}"#] {
        let res = resources(
            sample_corpus(),
            FixedModel::new(reply),
            FixedModel::new("ok"),
            Arc::new(OverlapModel::default()),
        )
        .await;
        let orchestrator = Orchestrator::new(res, Arc::new(InMemorySessionStore::new()), PipelineMode::MultiCorpus);
        let data = orchestrator.run_turn(QUESTION, Vec::new()).await.unwrap();
        assert_eq!(data.datasource, Some(Datasource::Actual), "{reply}");
        assert!(data.documents.len() <= 5 && !data.documents.is_empty());
        let legacy = sample_corpus().text(2).unwrap().to_string();
        assert!(!data.documents.contains(&legacy));
    }
}

#[tokio::test]
async fn single_corpus_skips_the_router() {
    let router = FixedModel::new(r#"{"datasource": "legacy"}"#);
    let res = resources(sample_corpus(), router.clone(), FixedModel::new("ok"), Arc::new(OverlapModel::default())).await;
    let orchestrator = Orchestrator::new(res, Arc::new(InMemorySessionStore::new()), PipelineMode::SingleCorpus);
    let data = orchestrator.run_turn(QUESTION, Vec::new()).await.unwrap();
    assert_eq!(router.calls.load(Ordering::SeqCst), 0);
    assert_eq!(data.datasource, None);
    assert!(!data.trace.contains(&TurnState::Route));
    assert_eq!(data.final_state(), TurnState::End);
    assert_eq!(data.documents.len(), 5);
}

#[tokio::test]
async fn upstream_failure_leaves_session_untouched() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let res = resources(
        sample_corpus(),
        FixedModel::new(r#"{"datasource": "actual"}"#),
        Arc::new(FailingModel),
        Arc::new(OverlapModel::default()),
    )
    .await;
    let orchestrator = Orchestrator::new(res, sessions.clone(), PipelineMode::MultiCorpus);
    let err = orchestrator.chat(request(QUESTION, Some("conv-1"))).await.unwrap_err();
    assert!(err.is_upstream(), "got {err:?}");
    assert_eq!(sessions.load("conv-1").await.unwrap(), None);
}

#[tokio::test]
async fn blank_input_is_rejected_before_any_work() {
    let router = FixedModel::new(r#"{"datasource": "actual"}"#);
    let sessions = Arc::new(InMemorySessionStore::new());
    let res = resources(sample_corpus(), router.clone(), FixedModel::new("ok"), Arc::new(OverlapModel::default())).await;
    let orchestrator = Orchestrator::new(res, sessions.clone(), PipelineMode::MultiCorpus);
    let err = orchestrator.chat(request("   ", None)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(router.calls.load(Ordering::SeqCst), 0);
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn file_sessions_survive_a_new_orchestrator() {
    let tmp = TempDir::new().unwrap();
    let first_id = {
        let store = Arc::new(FileSessionStore::open(tmp.path()).await.unwrap());
        let res = resources(
            sample_corpus(),
            FixedModel::new(r#"{"datasource": "actual"}"#),
            FixedModel::new("Capital social."),
            Arc::new(OverlapModel::default()),
        )
        .await;
        Orchestrator::new(res, store, PipelineMode::MultiCorpus)
            .chat(request(QUESTION, None))
            .await
            .unwrap()
            .conversation_id
    };

    let store = Arc::new(FileSessionStore::open(tmp.path()).await.unwrap());
    let res = resources(
        sample_corpus(),
        FixedModel::new(r#"{"datasource": "actual"}"#),
        Arc::new(EchoModel),
        Arc::new(OverlapModel::default()),
    )
    .await;
    let response = Orchestrator::new(res, store, PipelineMode::MultiCorpus)
        .chat(request("¿y el 101?", Some(&first_id)))
        .await
        .unwrap();
    assert!(response.assistant_response.contains("Asistente: Capital social."));
}
