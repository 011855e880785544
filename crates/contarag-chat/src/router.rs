use std::sync::Arc;

use tracing::{info, instrument, warn};

use contarag_core::error::Result;
use contarag_core::traits::ChatModel;
use contarag_core::types::Datasource;

/// Classifies a question into the corpus partition it should be answered from.
pub struct Router {
    model: Arc<dyn ChatModel>,
    default: Datasource,
}

impl Router {
    pub fn new(model: Arc<dyn ChatModel>, default: Datasource) -> Self {
        Self { model, default }
    }

    /// Model failures propagate; unparseable output falls back to the
    /// default datasource.
    #[instrument(name = "route", skip_all)]
    pub async fn route(&self, question: &str) -> Result<Datasource> {
        let raw = self.model.complete(&routing_prompt(question), true).await?;
        let datasource = match parse_route(&raw) {
            Some(d) => d,
            None => {
                warn!(output = %raw, fallback = %self.default, "router output not understood");
                self.default
            }
        };
        info!(%datasource, "routed");
        Ok(datasource)
    }
}

pub fn routing_prompt(question: &str) -> String {
    format!(
        r#"Tu tarea es clasificar la pregunta de un usuario sobre contabilidad para determinar qué base de conocimiento consultar.
Las opciones son:
- 'legacy': para preguntas sobre el Plan General Contable de 1990.
- 'actual': para preguntas sobre el Plan General Contable vigente (post-2007).
- 'both': para preguntas que comparan ambos planes o preguntan sobre su evolución.

Pregunta del usuario: "{question}"

Analiza la pregunta y responde únicamente con un objeto JSON con la clave "datasource" y uno de los tres valores: "legacy", "actual", o "both"."#
    )
}

/// Reads `{"datasource": "..."}` from model output. The whole output must be
/// that JSON object; anything else is `None`.
pub fn parse_route(raw: &str) -> Option<Datasource> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    value.get("datasource")?.as_str()?.trim().parse().ok()
}
