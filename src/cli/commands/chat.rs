//! Interactive terminal chat through the same session boundary as the server.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::session::ChatService;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings, credentials: Credentials) -> anyhow::Result<()> {
    if credentials.model_api_key.is_none() {
        Output::error("No model API key found (GOOGLE_API_KEY or OPENAI_API_KEY).");
        Output::info("Run 'palaver doctor' for detailed diagnostics.");
        anyhow::bail!("model API key not set");
    }

    let prompts = settings.load_prompts()?;
    let service = ChatService::from_settings(&settings, &credentials, &prompts)?;
    let mut thread_id: Option<String> = None;

    println!("\n{}", style("Palaver Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type a message, or 'exit' to quit. Use 'clear' to start a new conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            thread_id = None;
            Output::info("Started a new conversation.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = service.handle(input, thread_id.as_deref()).await;
        spinner.finish_and_clear();

        match result {
            Ok(reply) => {
                for record in &reply.tool_calls {
                    Output::tool_call(record);
                }
                if !reply.complete {
                    Output::warning("Stopped after reaching the step limit.");
                }
                println!("\n{} {}\n", style("Palaver:").cyan().bold(), reply.response);
                thread_id = Some(reply.thread_id);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
