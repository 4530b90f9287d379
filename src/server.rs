//! HTTP surface: the chat endpoint plus the static UI bundle.

use crate::error::PalaverError;
use crate::session::ChatService;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::error;

/// Shared application state.
pub struct AppState {
    pub chat: ChatService,
}

/// Build the router. Static files are the fallback so `/chat` is never shadowed.
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: PalaverError) -> Response {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!("Chat turn failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    match state.chat.handle(&req.message, req.thread_id.as_deref()).await {
        Ok(reply) => Json(ChatResponse {
            response: reply.response,
            thread_id: reply.thread_id,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::conversation::MemoryConversationStore;
    use crate::model::testing::{call, ScriptedModel};
    use crate::model::Completion;
    use crate::tools::{GetWeatherTool, ToolRegistry};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn state_with(model: Arc<ScriptedModel>, tools: ToolRegistry) -> Arc<AppState> {
        let agent = Agent::new(model, Arc::new(tools));
        let chat = ChatService::new(Arc::new(MemoryConversationStore::new()), agent, "system");
        Arc::new(AppState { chat })
    }

    fn app(state: Arc<AppState>) -> Router {
        router(state, Path::new("does-not-exist"))
    }

    fn post_chat(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_chat_returns_thread_id() {
        let model = Arc::new(ScriptedModel::new(vec![Completion::FinalAnswer(
            "Hi!".into(),
        )]));
        let state = state_with(model, ToolRegistry::new());

        let response = app(state).oneshot(post_chat(json!({"message": "hello"}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let reply: ChatResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(reply.response, "Hi!");
        assert!(!reply.thread_id.is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let state = state_with(model.clone(), ToolRegistry::new());

        let response = app(state.clone())
            .oneshot(post_chat(json!({"message": "   ", "thread_id": null})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Invalid input: Message cannot be empty"
        );
        assert_eq!(model.calls(), 0);
        assert!(state.chat.store().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_model_failure_is_server_error() {
        let model = Arc::new(ScriptedModel::failing("provider unavailable"));
        let state = state_with(model, ToolRegistry::new());

        let response = app(state).oneshot(post_chat(json!({"message": "hello"}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("provider unavailable"));
    }

    #[tokio::test]
    async fn test_weather_without_key_still_succeeds() {
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::ToolRequests {
                content: String::new(),
                calls: vec![call("w1", "get_weather", json!({"city": "London"}))],
            },
            Completion::FinalAnswer("I couldn't reach the weather service for London.".into()),
        ]));
        let mut tools = ToolRegistry::new();
        tools
            .register(GetWeatherTool::new(reqwest::Client::new(), None))
            .unwrap();
        let state = state_with(model.clone(), tools);

        let response = app(state)
            .oneshot(post_chat(json!({"message": "What's the weather in London?"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let second = &model.histories_seen()[1];
        assert_eq!(
            second.last().unwrap().content,
            "Error: OPENWEATHER_API_KEY not set."
        );
    }

    #[tokio::test]
    async fn test_health() {
        let state = state_with(Arc::new(ScriptedModel::new(vec![])), ToolRegistry::new());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_unknown_path_falls_through_to_static() {
        let state = state_with(Arc::new(ScriptedModel::new(vec![])), ToolRegistry::new());
        let request = Request::builder().uri("/missing.js").body(Body::empty()).unwrap();

        let response = app(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
