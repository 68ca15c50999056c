use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use scout_agent::TurnOrchestrator;
use scout_core::ScoutConfig;
use scout_docs::DocumentManager;
use scout_sessions::SessionStore;

use crate::rate_limit::RateLimiter;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ScoutConfig,
    pub orchestrator: TurnOrchestrator,
    pub sessions: Arc<SessionStore>,
    pub docs: Arc<DocumentManager>,
    pub rate: RateLimiter,
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat/stream", post(crate::http::chat::chat_stream_handler))
        .route("/chat/upload-pdf", post(crate::http::upload::upload_pdf_handler))
        .route(
            "/chat/cleanup-all-pdfs",
            post(crate::http::cleanup::cleanup_all_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
