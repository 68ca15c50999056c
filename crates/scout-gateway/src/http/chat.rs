//! Streaming chat endpoint — POST /chat/stream
//!
//! Request:  `{"message": "...", "sessionId"?: "...", "mode"?: "research"|"pdf"}`
//! Response: an SSE stream of frames
//!           `data: {"chunk": "...", "done": false, "status"?: "...", "error"?: true}`
//!
//! The stream ends after the frame with `done = true`, or when the client
//! disconnects — which cancels the in-flight turn.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scout_core::{TurnEvent, TurnRequest};

use crate::app::AppState;

#[derive(Serialize)]
pub struct ChatError {
    pub error: String,
}

/// POST /chat/stream — run one turn and stream its events.
pub async fn chat_stream_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<TurnRequest>,
) -> Result<Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ChatError>)>
{
    if !state.rate.check(&addr.ip().to_string()) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ChatError {
                error: "Too many requests, please try again later.".to_string(),
            }),
        ));
    }

    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ChatError {
                error: "message cannot be empty".to_string(),
            }),
        ));
    }

    info!(
        session = req.session_id.as_deref().unwrap_or("default"),
        mode = ?req.mode,
        "chat stream request"
    );

    let (tx, mut rx) = mpsc::channel::<TurnEvent>(64);
    let cancel = CancellationToken::new();

    let turn_state = Arc::clone(&state);
    let turn_cancel = cancel.clone();
    tokio::spawn(async move {
        turn_state.orchestrator.handle_turn(req, tx, turn_cancel).await;
    });

    let stream = async_stream::stream! {
        // dropped when the client goes away — cancels the turn
        let _guard = cancel.drop_guard();
        while let Some(event) = rx.recv().await {
            let done = event.done;
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => warn!(error = %e, "failed to serialize turn event"),
            }
            if done {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
