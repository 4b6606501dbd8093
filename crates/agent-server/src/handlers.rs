//! HTTP/WebSocket Handlers

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use agent_core::agent_response;

use crate::state::{AppState, ChatSession};

/// Delay between streamed word chunks
const STREAM_CHUNK_DELAY: Duration = Duration::from_millis(50);

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
    pub mcp_url: String,
    pub tools: Vec<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct SiteRequest {
    pub site: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn session_not_found(id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session '{}' not found", id),
            code: "SESSION_NOT_FOUND".into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state
        .agent
        .provider()
        .health_check()
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
        mcp_url: state.mcp.url().to_string(),
        tools: state
            .agent
            .tools()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

/// Open a new chat session
pub async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session_id = state.open_session().await;
    tracing::info!(session = %session_id, "session opened");
    Json(SessionResponse { session_id })
}

/// Set the site context for a session.
///
/// Subsequent questions on the session are submitted with the site
/// prepended.
pub async fn set_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SiteRequest>,
) -> Result<StatusCode, ApiError> {
    let session = state.session(&id).await.ok_or_else(|| session_not_found(&id))?;

    *session.site.write().await = Some(payload.site);
    Ok(StatusCode::NO_CONTENT)
}

/// Run one user turn on a session and return the formatted response.
///
/// Agent faults never surface as HTTP errors; they come back as
/// "Error: ..." text like any other response.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let session = state.session(&id).await.ok_or_else(|| session_not_found(&id))?;

    let response = run_turn(&state, &session, &payload.message).await;
    Ok(Json(MessageResponse { response }))
}

async fn run_turn(state: &AppState, session: &ChatSession, message: &str) -> String {
    let site = session.site.read().await.clone();
    agent_response(&state.agent, message, &session.thread, site.as_deref()).await
}

/// WebSocket streaming endpoint.
///
/// The client sends `{"message": "..."}` frames; the server answers
/// each with word-sized chunk frames followed by a done frame.
pub async fn stream_session(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state, id))
}

async fn handle_stream(socket: WebSocket, state: AppState, session_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let Some(session) = state.session(&session_id).await else {
        let error = serde_json::json!({
            "type": "error",
            "error": format!("Session '{}' not found", session_id),
        });
        let _ = sender.send(Message::Text(error.to_string().into())).await;
        return;
    };

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        let request: MessageRequest = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.to_string()});
                let _ = sender.send(Message::Text(error.to_string().into())).await;
                continue;
            }
        };

        let response = run_turn(&state, &session, &request.message).await;

        // Simulated token stream: whole response first, then replayed
        // to the client word by word
        let mut disconnected = false;
        for word in response.split_whitespace() {
            let chunk = serde_json::json!({
                "type": "chunk",
                "content": format!("{} ", word),
                "done": false,
            });
            if sender.send(Message::Text(chunk.to_string().into())).await.is_err() {
                disconnected = true;
                break;
            }
            tokio::time::sleep(STREAM_CHUNK_DELAY).await;
        }
        if disconnected {
            break;
        }

        let done = serde_json::json!({"type": "chunk", "content": "", "done": true});
        if sender.send(Message::Text(done.to_string().into())).await.is_err() {
            break;
        }
    }
}
