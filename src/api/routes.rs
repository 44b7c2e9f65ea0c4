//! Route Definitions

use super::{handlers::*, websocket::websocket_handler};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Build the router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Session channel for login / balance / gamestate / bet
        .route("/ws", get(websocket_handler))
        .with_state(state)
}
