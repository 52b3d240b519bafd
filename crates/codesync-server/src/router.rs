//! HTTP routes for the command queue.

use crate::config::AppState;
use crate::handlers::{command_status, create_command, pending_commands, update_command};
use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        // Web client
        .route("/create-command", post(create_command))
        .route("/command-status", get(command_status))
        // Editor agent
        .route("/pending-commands", get(pending_commands))
        .route("/update-command", post(update_command))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK - codesync command broker"
}
