use std::io::{self, BufRead, Write};

use anyhow::Context;
use contarag_chat::{ChatRequest, Orchestrator};
use contarag_cli::telemetry::init_tracing;
use contarag_core::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;
    let orchestrator = Orchestrator::from_settings(&settings).await.context("loading resources")?;

    println!("Chatbot contable. Escribe 'salir' o 'exit' para terminar.");
    let mut conversation_id: Option<String> = None;
    let stdin = io::stdin();
    loop {
        print!("\nTú: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("salir") || input.eq_ignore_ascii_case("exit") {
            break;
        }
        let request = ChatRequest { user_input: input.to_string(), conversation_id: conversation_id.clone() };
        match orchestrator.chat(request).await {
            Ok(response) => {
                println!("\nAsistente: {}", response.assistant_response);
                conversation_id = Some(response.conversation_id);
            }
            Err(e) => eprintln!("\nError: {e}"),
        }
    }
    println!("¡Hasta luego!");
    Ok(())
}
