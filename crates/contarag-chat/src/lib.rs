//! Conversational pipeline on top of hybrid retrieval.
//!
//! A turn runs `start → [route] → retrieve → rerank → {generate |
//! handle_no_documents} → end` as an explicit state machine ([`state`]).
//! Every collaborator lives in a [`Resources`] bundle built once at
//! startup, and history is kept in a [`SessionStore`](contarag_core::traits::SessionStore)
//! addressed by conversation id.

pub mod generator;
pub mod orchestrator;
pub mod resources;
pub mod router;
pub mod session;
pub mod state;

pub use generator::{AnswerGenerator, CONTEXT_SEPARATOR, NO_DOCUMENTS_RESPONSE};
pub use orchestrator::{ChatRequest, ChatResponse, Orchestrator};
pub use resources::Resources;
pub use router::Router;
pub use session::{FileSessionStore, InMemorySessionStore};
pub use state::{next_state, PipelineMode, TurnData, TurnDelta, TurnState};
