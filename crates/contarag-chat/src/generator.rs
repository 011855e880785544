use std::sync::Arc;

use tracing::{info, instrument};

use contarag_core::error::Result;
use contarag_core::traits::ChatModel;
use contarag_core::types::Message;

/// Reply used when no document survives reranking.
pub const NO_DOCUMENTS_RESPONSE: &str =
    "Lo siento, no he podido encontrar información relevante para responder a tu pregunta.";

/// Placed between context documents in the generation prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const INSTRUCTIONS: &str = "Eres un asistente experto en contabilidad. Responde a la pregunta del usuario basándote \
estricta y únicamente en el siguiente contexto. Si la pregunta es una comparación, asegúrate de usar la información \
de ambas fuentes si se proporciona. Si la respuesta no está en el contexto, indícalo claramente.";

pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// One completion call, no retries; the raw output is the answer.
    #[instrument(name = "generate", skip_all, fields(documents = documents.len(), history = history.len()))]
    pub async fn generate(&self, question: &str, documents: &[String], history: &[Message]) -> Result<String> {
        let prompt = build_prompt(question, documents, history);
        let answer = self.model.complete(&prompt, false).await?;
        info!(answer_len = answer.len(), "answer generated");
        Ok(answer)
    }

    #[instrument(name = "handle_no_documents", skip_all)]
    pub fn handle_no_documents(&self) -> String {
        info!("no relevant documents; answering with fallback");
        NO_DOCUMENTS_RESPONSE.to_string()
    }
}

/// History first, then context, then the question.
pub fn build_prompt(question: &str, documents: &[String], history: &[Message]) -> String {
    let history_str = if history.is_empty() {
        "(sin mensajes previos)".to_string()
    } else {
        history
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let context_str = documents.join(CONTEXT_SEPARATOR);
    format!(
        "{INSTRUCTIONS}\n\nHISTORIAL DE LA CONVERSACIÓN:\n{history_str}\n\nCONTEXTO:\n{context_str}\n\nPREGUNTA:\n{question}\n\nRESPUESTA:\n"
    )
}
