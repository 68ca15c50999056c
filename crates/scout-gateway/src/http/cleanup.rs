//! Administrative cleanup — POST /chat/cleanup-all-pdfs
//!
//! Drops every session and every uploaded document process-wide. Called by
//! the explicit clear-chat action and as a best-effort beacon on client
//! page-unload.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

pub async fn cleanup_all_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.sessions.clear_all();
    match state.docs.cleanup(None).await {
        Ok(()) => {
            info!("cleanup-all complete");
            Json(json!({ "success": true }))
        }
        Err(e) => {
            warn!(error = %e, "cleanup-all failed");
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}
