use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use contarag_core::config::Settings;
use contarag_core::error::{Error, Result};
use contarag_core::traits::SessionStore;
use contarag_core::types::Message;

use crate::resources::Resources;
use crate::session::{FileSessionStore, InMemorySessionStore};
use crate::state::{next_state, PipelineMode, TurnData, TurnDelta, TurnState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub assistant_response: String,
    pub conversation_id: String,
}

/// Runs one turn per inbound message. Holds no conversation state itself;
/// history lives in the session store.
pub struct Orchestrator {
    resources: Arc<Resources>,
    sessions: Arc<dyn SessionStore>,
    mode: PipelineMode,
}

impl Orchestrator {
    pub fn new(resources: Arc<Resources>, sessions: Arc<dyn SessionStore>, mode: PipelineMode) -> Self {
        Self { resources, sessions, mode }
    }

    /// Loads every resource and picks the session store from config.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let resources = Arc::new(Resources::load(settings).await?);
        let sessions: Arc<dyn SessionStore> = match &settings.data.session_dir {
            Some(dir) => Arc::new(FileSessionStore::open(Path::new(dir)).await?),
            None => Arc::new(InMemorySessionStore::new()),
        };
        Ok(Self::new(resources, sessions, PipelineMode::from_multi_corpus(settings.retrieval.multi_corpus)))
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Answers `request`, creating a conversation when it carries no id.
    /// The user and assistant messages are stored together, and only when
    /// the turn succeeds.
    #[instrument(skip_all, fields(conversation_id = tracing::field::Empty))]
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let question = request.user_input.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("user_input must not be empty".to_string()));
        }
        let conversation_id = match request.conversation_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        tracing::Span::current().record("conversation_id", conversation_id.as_str());

        let history = self.sessions.load(&conversation_id).await?.unwrap_or_default();
        let data = self.run_turn(question, history).await?;
        let assistant_response = data
            .assistant_response()
            .map(str::to_string)
            .ok_or_else(|| Error::Operation("turn ended without an assistant message".to_string()))?;
        self.sessions.append(&conversation_id, data.new_messages().to_vec()).await?;
        info!(final_state = ?data.final_state(), datasource = ?data.datasource, "turn completed");
        Ok(ChatResponse { assistant_response, conversation_id })
    }

    /// Drives the state machine from `Start` to `End`.
    pub async fn run_turn(&self, question: &str, history: Vec<Message>) -> Result<TurnData> {
        let mut data = TurnData::new(question, history);
        let mut state = TurnState::Start;
        while !state.is_terminal() {
            state = next_state(state, &data, self.mode);
            data.trace.push(state);
            if let Some(delta) = self.run_node(state, &data).await? {
                data.apply(delta);
            }
        }
        Ok(data)
    }

    async fn run_node(&self, state: TurnState, data: &TurnData) -> Result<Option<TurnDelta>> {
        let r = &self.resources;
        let delta = match state {
            TurnState::Start | TurnState::End => None,
            TurnState::Route => Some(TurnDelta::Datasource(r.router.route(&data.question).await?)),
            TurnState::Retrieve => Some(TurnDelta::Documents(
                r.retriever.retrieve(&data.question, data.datasource, r.candidate_limit).await?,
            )),
            TurnState::Rerank => {
                Some(TurnDelta::Documents(r.reranker.rerank(&data.question, data.documents.clone()).await?))
            }
            TurnState::Generate => Some(TurnDelta::AssistantMessage(
                r.generator.generate(&data.question, &data.documents, data.history()).await?,
            )),
            TurnState::HandleNoDocuments => Some(TurnDelta::AssistantMessage(r.generator.handle_no_documents())),
        };
        Ok(delta)
    }
}
