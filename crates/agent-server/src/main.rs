//! ReAct MCP Agent HTTP Server
//!
//! Axum-based server exposing the agent over REST and WebSocket.
//! Sessions map one-to-one onto memory threads; the site context of a
//! session is prepended to every question asked on it.

mod handlers;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{create_session, health_check, send_message, set_site, stream_session};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Configuration problems are fatal; a down tool server is not
    let (agent, mcp) = agent_runtime::bootstrap::start().await?;

    match agent.provider().health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Azure OpenAI"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Azure OpenAI not reachable - agent calls will fail");
        }
    }

    tracing::info!("Registered {} tools:", agent.tools().len());
    for name in agent.tools().names() {
        tracing::info!("  • {}", name);
    }

    let state = AppState::new(agent, mcp);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/session", post(create_session))
        .route("/api/session/{id}/message", post(send_message))
        .route("/api/session/{id}/site", post(set_site))
        .route("/api/session/{id}/stream", get(stream_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 agent server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                    - Health check");
    tracing::info!("  POST /api/session               - Open a session");
    tracing::info!("  POST /api/session/{{id}}/message  - Send a message");
    tracing::info!("  POST /api/session/{{id}}/site     - Set site context");
    tracing::info!("  GET  /api/session/{{id}}/stream   - WebSocket streaming");

    axum::serve(listener, app).await?;

    Ok(())
}
