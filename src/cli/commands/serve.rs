//! HTTP chat server.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::server::{router, AppState};
use crate::session::ChatService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the HTTP chat server.
pub async fn run_serve(
    host: &str,
    port: u16,
    static_dir: PathBuf,
    settings: Settings,
    credentials: Credentials,
) -> anyhow::Result<()> {
    let prompts = settings.load_prompts()?;
    let chat = ChatService::from_settings(&settings, &credentials, &prompts)?;
    let state = Arc::new(AppState { chat });

    if !static_dir.is_dir() {
        Output::warning(&format!(
            "Static directory {} not found; only the API will be served.",
            static_dir.display()
        ));
    }
    let app = router(state, &static_dir);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Palaver Chat Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Chat", "POST /chat");
    Output::kv("Health", "GET  /health");
    Output::kv("UI", &format!("GET  / ({})", static_dir.display()));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
