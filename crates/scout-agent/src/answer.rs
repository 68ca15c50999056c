//! Token streaming stage.
//!
//! Drives one streaming generation call and forwards fragments to the turn's
//! event channel in receipt order, accumulating the complete text for the
//! reformatting handoff. Whitespace-only fragments are suppressed, not
//! forwarded. After cancellation nothing further is emitted; a generation
//! failure produces a single terminal error event.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use scout_core::TurnEvent;

use crate::provider::{ChatRequest, LlmProvider};
use crate::stream::StreamEvent;

/// Stream one answer. Returns the accumulated full text on normal
/// exhaustion, or `None` when the turn is already over (cancelled, receiver
/// gone, or a terminal error event was emitted here). Lifecycle markers
/// (`streaming-complete`, `formatted-complete`) are the orchestrator's job.
pub async fn stream_answer(
    provider: Arc<dyn LlmProvider>,
    mut req: ChatRequest,
    tx: &mpsc::Sender<TurnEvent>,
    cancel: &CancellationToken,
) -> Option<String> {
    req.stream = true;

    let (ptx, mut prx) = mpsc::channel::<StreamEvent>(64);
    let task = tokio::spawn(async move { provider.send_stream(&req, ptx).await });

    let mut accumulated = String::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("stream cancelled — dropping remaining fragments");
                task.abort();
                return None;
            }
            event = prx.recv() => match event {
                Some(StreamEvent::TextDelta { text }) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    accumulated.push_str(&text);
                    if tx.send(TurnEvent::chunk(text)).await.is_err() {
                        // receiver gone — the client disconnected
                        cancel.cancel();
                        task.abort();
                        return None;
                    }
                }
                Some(StreamEvent::Done { .. }) => {
                    debug!(chars = accumulated.len(), "stream exhausted");
                    return Some(accumulated);
                }
                Some(StreamEvent::Error { message }) => {
                    warn!(error = %message, "generation stream error");
                    emit_error(tx, cancel, &message).await;
                    return None;
                }
                None => break,
            }
        }
    }

    // channel closed without a Done — surface the task's own error
    let message = match task.await {
        Ok(Err(e)) => e.to_string(),
        Ok(Ok(())) => "model stream ended unexpectedly".to_string(),
        Err(e) => e.to_string(),
    };
    warn!(error = %message, "streaming task failed");
    emit_error(tx, cancel, &message).await;
    None
}

async fn emit_error(tx: &mpsc::Sender<TurnEvent>, cancel: &CancellationToken, message: &str) {
    if cancel.is_cancelled() {
        return;
    }
    let event = TurnEvent::error(format!(
        "An error occurred while processing your request: {message}"
    ));
    let _ = tx.send(event).await;
}
