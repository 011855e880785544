//! Per-turn state and the pure transition function of the turn pipeline.

use serde::{Deserialize, Serialize};

use contarag_core::types::{Datasource, Message, Role};

/// Whether turns are routed to a corpus partition before retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineMode {
    SingleCorpus,
    MultiCorpus,
}

impl PipelineMode {
    pub fn from_multi_corpus(multi_corpus: bool) -> Self {
        if multi_corpus { Self::MultiCorpus } else { Self::SingleCorpus }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Start,
    Route,
    Retrieve,
    Rerank,
    Generate,
    HandleNoDocuments,
    End,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// Transition function. `End` is absorbing.
pub fn next_state(state: TurnState, data: &TurnData, mode: PipelineMode) -> TurnState {
    match state {
        TurnState::Start => match mode {
            PipelineMode::MultiCorpus => TurnState::Route,
            PipelineMode::SingleCorpus => TurnState::Retrieve,
        },
        TurnState::Route => TurnState::Retrieve,
        TurnState::Retrieve => TurnState::Rerank,
        TurnState::Rerank if data.documents.is_empty() => TurnState::HandleNoDocuments,
        TurnState::Rerank => TurnState::Generate,
        TurnState::Generate | TurnState::HandleNoDocuments | TurnState::End => TurnState::End,
    }
}

/// The only ways a pipeline node may change turn data.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDelta {
    Datasource(Datasource),
    Documents(Vec<String>),
    AssistantMessage(String),
}

/// Everything a turn reads and writes. `messages` holds the loaded history
/// followed by this turn's messages and only ever grows.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnData {
    pub question: String,
    pub datasource: Option<Datasource>,
    pub documents: Vec<String>,
    pub messages: Vec<Message>,
    pub trace: Vec<TurnState>,
    history_len: usize,
}

impl TurnData {
    /// Starts a turn: `history` plus the new user message.
    pub fn new(question: impl Into<String>, history: Vec<Message>) -> Self {
        let question = question.into();
        let history_len = history.len();
        let mut messages = history;
        messages.push(Message::user(question.clone()));
        Self { question, datasource: None, documents: Vec::new(), messages, trace: vec![TurnState::Start], history_len }
    }

    pub fn apply(&mut self, delta: TurnDelta) {
        match delta {
            TurnDelta::Datasource(d) => self.datasource = Some(d),
            TurnDelta::Documents(docs) => self.documents = docs,
            TurnDelta::AssistantMessage(text) => self.messages.push(Message::assistant(text)),
        }
    }

    /// History loaded before this turn started.
    pub fn history(&self) -> &[Message] {
        &self.messages[..self.history_len]
    }

    /// Messages added by this turn, in order.
    pub fn new_messages(&self) -> &[Message] {
        &self.messages[self.history_len..]
    }

    pub fn assistant_response(&self) -> Option<&str> {
        self.new_messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn final_state(&self) -> TurnState {
        self.trace.last().copied().unwrap_or(TurnState::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(mut data: TurnData, mode: PipelineMode) -> Vec<TurnState> {
        let mut state = TurnState::Start;
        let mut visited = vec![state];
        while !state.is_terminal() {
            state = next_state(state, &data, mode);
            visited.push(state);
            data.trace.push(state);
        }
        visited
    }

    #[test]
    fn multi_corpus_routes_first() {
        let mut data = TurnData::new("q", Vec::new());
        data.apply(TurnDelta::Documents(vec!["d".into()]));
        assert_eq!(
            walk(data, PipelineMode::MultiCorpus),
            vec![TurnState::Start, TurnState::Route, TurnState::Retrieve, TurnState::Rerank, TurnState::Generate, TurnState::End]
        );
    }

    #[test]
    fn single_corpus_starts_at_retrieve() {
        let data = TurnData::new("q", Vec::new());
        assert_eq!(next_state(TurnState::Start, &data, PipelineMode::SingleCorpus), TurnState::Retrieve);
    }

    #[test]
    fn empty_documents_after_rerank_fall_back() {
        let data = TurnData::new("q", Vec::new());
        for mode in [PipelineMode::SingleCorpus, PipelineMode::MultiCorpus] {
            assert_eq!(next_state(TurnState::Rerank, &data, mode), TurnState::HandleNoDocuments);
            assert_eq!(next_state(TurnState::HandleNoDocuments, &data, mode), TurnState::End);
            assert_eq!(next_state(TurnState::End, &data, mode), TurnState::End);
        }
    }

    #[test]
    fn documents_and_datasource_replace_messages_append() {
        let mut data = TurnData::new("segunda", vec![Message::user("primera"), Message::assistant("uno")]);
        data.apply(TurnDelta::Documents(vec!["a".into(), "b".into()]));
        data.apply(TurnDelta::Documents(vec!["c".into()]));
        data.apply(TurnDelta::Datasource(Datasource::Legacy));
        data.apply(TurnDelta::Datasource(Datasource::Both));
        data.apply(TurnDelta::AssistantMessage("dos".into()));

        assert_eq!(data.documents, vec!["c".to_string()]);
        assert_eq!(data.datasource, Some(Datasource::Both));
        assert_eq!(data.history().len(), 2);
        assert_eq!(data.new_messages(), &[Message::user("segunda"), Message::assistant("dos")]);
        assert_eq!(data.assistant_response(), Some("dos"));
    }
}
