//! Session orchestrator — sequences one turn through its stages.
//!
//! One call to `handle_turn` drives: session resolution → (research: tool
//! loop / pdf: retrieval) → token streaming → reformatting, emitting
//! lifecycle events on the turn's channel along the way. Errors never escape
//! to the caller; every failure becomes a terminal event. Once the
//! cancellation token fires, nothing further is emitted and no session state
//! is touched for the turn.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scout_core::{ChatMode, Phase, ScoutError, TurnEvent, TurnRequest};
use scout_docs::manager::NO_DOCUMENT;
use scout_docs::DocumentManager;
use scout_sessions::{SessionStore, DEFAULT_SESSION};

use crate::answer;
use crate::format;
use crate::provider::ChatRequest;
use crate::research::{self, GatheredContext};
use crate::runtime::AgentRuntime;
use crate::tools::Tool;
use crate::validator::KEY_NOT_CONFIGURED;

/// Owns the per-turn pipeline. Shared via Arc in the gateway's AppState.
pub struct TurnOrchestrator {
    runtime: Arc<AgentRuntime>,
    sessions: Arc<SessionStore>,
    docs: Arc<DocumentManager>,
    tools: Vec<Box<dyn Tool>>,
}

impl TurnOrchestrator {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        sessions: Arc<SessionStore>,
        docs: Arc<DocumentManager>,
        tools: Vec<Box<dyn Tool>>,
    ) -> Self {
        Self {
            runtime,
            sessions,
            docs,
            tools,
        }
    }

    /// Run one turn to completion, emitting events on `tx`.
    ///
    /// Never fails: unexpected stage errors are converted into a terminal
    /// error event here, at the outermost boundary.
    pub async fn handle_turn(
        &self,
        req: TurnRequest,
        tx: mpsc::Sender<TurnEvent>,
        cancel: CancellationToken,
    ) {
        let session_key = req
            .session_id
            .clone()
            .unwrap_or_else(|| DEFAULT_SESSION.to_string());
        let mode = self.sessions.ensure(&session_key, req.mode);

        // Appended before generation so the in-flight turn sees its own
        // message; never rolled back, even on abort.
        self.sessions.append_history(&session_key, &req.message);
        info!(session = %session_key, ?mode, "turn started");

        if let Err(err) = self
            .run(&session_key, mode, &req.message, &tx, &cancel)
            .await
        {
            warn!(code = err.code(), error = %err, "turn failed");
            let message = match err {
                ScoutError::Retrieval(_) => {
                    "Error searching the PDF content. Please try again.".to_string()
                }
                _ => "An error occurred while processing your request.".to_string(),
            };
            emit(&tx, &cancel, TurnEvent::error(message)).await;
        }
    }

    async fn run(
        &self,
        session_key: &str,
        mode: ChatMode,
        message: &str,
        tx: &mpsc::Sender<TurnEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), ScoutError> {
        if !self.runtime.validator().is_valid().await {
            emit(tx, cancel, TurnEvent::error(KEY_NOT_CONFIGURED)).await;
            return Ok(());
        }

        match mode {
            ChatMode::Research => self.run_research(session_key, message, tx, cancel).await,
            ChatMode::Pdf => self.run_pdf(session_key, message, tx, cancel).await,
        }
    }

    async fn run_research(
        &self,
        session_key: &str,
        message: &str,
        tx: &mpsc::Sender<TurnEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), ScoutError> {
        if !emit(tx, cancel, TurnEvent::marker(Phase::Researching)).await {
            return Ok(());
        }

        // history minus the entry appended for this turn
        let mut history = self.sessions.history(session_key);
        history.pop();

        let gathered = research::gather(
            self.runtime.provider().as_ref(),
            self.runtime.model(),
            self.runtime.max_tokens(),
            message,
            &history,
            &self.tools,
            cancel,
        )
        .await;

        if !emit(tx, cancel, TurnEvent::marker(Phase::Streaming)).await {
            return Ok(());
        }

        let req = self.research_request(message, &history, &gathered);
        self.finish_stream(req, tx, cancel).await
    }

    async fn run_pdf(
        &self,
        session_key: &str,
        message: &str,
        tx: &mpsc::Sender<TurnEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), ScoutError> {
        if !self.docs.has_document(session_key) {
            emit(tx, cancel, TurnEvent::error(NO_DOCUMENT)).await;
            return Ok(());
        }

        if !emit(tx, cancel, TurnEvent::marker(Phase::Streaming)).await {
            return Ok(());
        }

        let excerpts = self
            .docs
            .search(session_key, message)
            .await
            .map_err(|e| ScoutError::Retrieval(e.to_string()))?;

        let req = self.pdf_request(message, &excerpts);
        self.finish_stream(req, tx, cancel).await
    }

    /// Shared tail of both flows: stream the answer, then mark completion
    /// and deliver the reformatted text as the single terminal event.
    async fn finish_stream(
        &self,
        req: ChatRequest,
        tx: &mpsc::Sender<TurnEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), ScoutError> {
        let provider = Arc::clone(self.runtime.provider());
        let Some(full_text) = answer::stream_answer(provider, req, tx, cancel).await else {
            // cancelled, disconnected, or the stage already emitted a
            // terminal error
            return Ok(());
        };

        if !emit(tx, cancel, TurnEvent::marker(Phase::StreamingComplete)).await {
            return Ok(());
        }

        let polished = format::reformat(
            self.runtime.provider().as_ref(),
            self.runtime.model(),
            self.runtime.max_tokens(),
            &full_text,
        )
        .await;

        emit(tx, cancel, TurnEvent::final_text(polished)).await;
        Ok(())
    }

    fn research_request(
        &self,
        message: &str,
        history: &[String],
        gathered: &GatheredContext,
    ) -> ChatRequest {
        let system = if gathered.tool_error {
            format!(
                "You are a helpful assistant. Research tools failed while preparing this \
                 answer: {}. Acknowledge the failure where it affects your answer.",
                gathered.context
            )
        } else if !gathered.is_empty() {
            format!(
                "You are a helpful assistant. When answering, use the following context \
                 information: {}",
                gathered.context
            )
        } else {
            "You are a helpful assistant.".to_string()
        };

        let mut req = ChatRequest::new(
            self.runtime.model(),
            system,
            self.runtime.max_tokens(),
        );
        for prior in history {
            req = req.user(prior.clone());
        }
        req.user(message)
    }

    fn pdf_request(&self, message: &str, excerpts: &str) -> ChatRequest {
        let system = format!(
            "You are a helpful assistant answering questions about an uploaded PDF \
             document. Base your answer only on the following excerpts from the \
             document:\n\n{excerpts}"
        );
        // no history in pdf mode — the question stands alone
        ChatRequest::new(self.runtime.model(), system, self.runtime.max_tokens()).user(message)
    }
}

/// Send one event unless the turn is already over.
///
/// Returns false when emission must stop: the token fired, or the receiver
/// disappeared (client disconnect — which also trips the token so every
/// other stage stops too).
async fn emit(
    tx: &mpsc::Sender<TurnEvent>,
    cancel: &CancellationToken,
    event: TurnEvent,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if tx.send(event).await.is_err() {
        cancel.cancel();
        return false;
    }
    true
}
