//! End-to-end turn pipeline tests against a scripted provider.
//!
//! The provider mock pops canned responses for non-streaming calls and
//! canned event scripts for streaming calls, so every flow runs without a
//! network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use scout_agent::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, ToolCall};
use scout_agent::runtime::AgentRuntime;
use scout_agent::stream::StreamEvent;
use scout_agent::tools::current_time::CurrentTimeTool;
use scout_agent::tools::Tool;
use scout_agent::turn::TurnOrchestrator;
use scout_agent::validator::KeyValidator;
use scout_core::{ChatMode, Phase, TurnEvent, TurnRequest};
use scout_docs::embed::Embedder;
use scout_docs::{DocError, DocumentManager};
use scout_sessions::SessionStore;

// ── scripted provider ────────────────────────────────────────────────────────

enum StreamScript {
    /// Emit these events, then return.
    Events(Vec<StreamEvent>),
    /// Emit these events, then hang until cancelled.
    EventsThenHang(Vec<StreamEvent>),
}

struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
    streams: Mutex<VecDeque<StreamScript>>,
    send_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<ChatResponse>, streams: Vec<StreamScript>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            streams: Mutex::new(streams.into()),
            send_calls: AtomicUsize::new(0),
        }
    }

    fn send_count(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| text_response("fallback")))
    }

    async fn send_stream(
        &self,
        _req: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let script = self.streams.lock().await.pop_front();
        match script {
            Some(StreamScript::Events(events)) => {
                for ev in events {
                    if tx.send(ev).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(())
            }
            Some(StreamScript::EventsThenHang(events)) => {
                for ev in events {
                    if tx.send(ev).await.is_err() {
                        return Ok(());
                    }
                }
                std::future::pending::<()>().await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        model: "mock".to_string(),
        tokens_in: 0,
        tokens_out: 0,
        stop_reason: "stop".to_string(),
        tool_calls: Vec::new(),
    }
}

fn tool_call_response(tool: &str, input: &str) -> ChatResponse {
    ChatResponse {
        tool_calls: vec![ToolCall {
            id: "call-1".to_string(),
            name: tool.to_string(),
            input: serde_json::json!({ "input": input }),
        }],
        stop_reason: "tool_calls".to_string(),
        ..text_response("")
    }
}

fn delta(text: &str) -> StreamEvent {
    StreamEvent::TextDelta {
        text: text.to_string(),
    }
}

fn done() -> StreamEvent {
    StreamEvent::Done {
        model: "mock".to_string(),
        tokens_in: 0,
        tokens_out: 0,
        stop_reason: "stop".to_string(),
    }
}

// ── harness ──────────────────────────────────────────────────────────────────

struct Harness {
    orchestrator: Arc<TurnOrchestrator>,
    sessions: Arc<SessionStore>,
    docs: Arc<DocumentManager>,
    provider: Arc<ScriptedProvider>,
    _upload_dir: tempfile::TempDir,
}

struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocError> {
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32, t.chars().filter(|c| *c == 'e').count() as f32, 1.0])
            .collect())
    }
}

fn harness(provider: ScriptedProvider, key_valid: bool) -> Harness {
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let provider = Arc::new(provider);
    let runtime = Arc::new(AgentRuntime::new(
        Arc::clone(&provider) as Arc<dyn LlmProvider>,
        "mock-model".to_string(),
        512,
        KeyValidator::prevalidated(key_valid),
    ));
    let sessions = Arc::new(SessionStore::new());
    let docs = Arc::new(
        DocumentManager::new(upload_dir.path(), Arc::new(FakeEmbedder)).expect("docs manager"),
    );
    let tools: Vec<Box<dyn Tool>> = vec![Box::new(CurrentTimeTool)];
    let orchestrator = Arc::new(TurnOrchestrator::new(
        runtime,
        Arc::clone(&sessions),
        Arc::clone(&docs),
        tools,
    ));
    Harness {
        orchestrator,
        sessions,
        docs,
        provider,
        _upload_dir: upload_dir,
    }
}

fn request(message: &str, session: &str, mode: Option<ChatMode>) -> TurnRequest {
    serde_json::from_value(serde_json::json!({
        "message": message,
        "sessionId": session,
        "mode": mode,
    }))
    .expect("valid request")
}

/// Run a turn to completion and collect every emitted event.
async fn run_turn(h: &Harness, req: TurnRequest) -> Vec<TurnEvent> {
    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    h.orchestrator.handle_turn(req, tx, cancel).await;
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

// ── research flow ────────────────────────────────────────────────────────────

#[tokio::test]
async fn research_turn_emits_full_phase_sequence() {
    let provider = ScriptedProvider::new(
        vec![
            tool_call_response("get_current_time", ""),
            text_response(""), // gather finishes: no more tool calls
            text_response("**Acme Corp** builds widgets"), // reformat
        ],
        vec![StreamScript::Events(vec![
            delta("Acme Corp "),
            delta("builds widgets"),
            done(),
        ])],
    );
    let h = harness(provider, true);

    let events = run_turn(&h, request("Acme Corp", "s1", Some(ChatMode::Research))).await;

    assert_eq!(events[0], TurnEvent::marker(Phase::Researching));
    assert_eq!(events[1], TurnEvent::marker(Phase::Streaming));
    assert_eq!(events[2], TurnEvent::chunk("Acme Corp "));
    assert_eq!(events[3], TurnEvent::chunk("builds widgets"));
    assert_eq!(events[4], TurnEvent::marker(Phase::StreamingComplete));
    assert_eq!(events[5], TurnEvent::final_text("**Acme Corp** builds widgets"));
    assert_eq!(events.len(), 6);

    // exactly one done event, and it is last
    let done_count = events.iter().filter(|e| e.done).count();
    assert_eq!(done_count, 1);
    assert!(events.last().map(|e| e.done).unwrap_or(false));

    // history committed
    assert_eq!(h.sessions.history("s1"), vec!["Acme Corp"]);
}

#[tokio::test]
async fn whitespace_fragments_are_suppressed() {
    let provider = ScriptedProvider::new(
        vec![text_response(""), text_response("hi there")],
        vec![StreamScript::Events(vec![
            delta("  \n"),
            delta("hi "),
            delta("   "),
            delta("there"),
            done(),
        ])],
    );
    let h = harness(provider, true);

    let events = run_turn(&h, request("hello", "s1", None)).await;
    let chunks: Vec<&str> = events
        .iter()
        .filter(|e| e.phase == Some(Phase::Streaming) && !e.chunk.is_empty())
        .map(|e| e.chunk.as_str())
        .collect();
    assert_eq!(chunks, vec!["hi ", "there"]);
}

#[tokio::test]
async fn stream_error_produces_single_terminal_error() {
    let provider = ScriptedProvider::new(
        vec![text_response("")],
        vec![StreamScript::Events(vec![
            delta("partial "),
            StreamEvent::Error {
                message: "connection reset".to_string(),
            },
        ])],
    );
    let h = harness(provider, true);

    let events = run_turn(&h, request("hello", "s1", None)).await;
    let last = events.last().expect("events");
    assert!(last.is_error);
    assert!(last.done);
    assert!(last.chunk.contains("connection reset"));
    // nothing after the terminal error
    assert_eq!(events.iter().filter(|e| e.done).count(), 1);
    // no streaming-complete / formatted-complete markers
    assert!(!events
        .iter()
        .any(|e| e.phase == Some(Phase::StreamingComplete)));
}

#[tokio::test]
async fn reformat_failure_falls_back_to_raw_answer() {
    // reformat returns empty content — the stage keeps the streamed text
    let provider = ScriptedProvider::new(
        vec![text_response(""), text_response("")],
        vec![StreamScript::Events(vec![delta("raw answer"), done()])],
    );
    let h = harness(provider, true);

    let events = run_turn(&h, request("hello", "s1", None)).await;
    let last = events.last().expect("events");
    assert!(last.done);
    assert_eq!(last.phase, Some(Phase::FormattedComplete));
    assert_eq!(last.chunk, "raw answer");
}

#[tokio::test]
async fn reformatting_preserves_word_multiset() {
    let raw = "alpha beta gamma delta";
    let formatted = "## alpha\n\n- beta\n- gamma\n- delta";
    let provider = ScriptedProvider::new(
        vec![text_response(""), text_response(formatted)],
        vec![StreamScript::Events(vec![delta(raw), done()])],
    );
    let h = harness(provider, true);

    let events = run_turn(&h, request("list greek letters", "s1", None)).await;
    let last = events.last().expect("events");

    let words = |s: &str| {
        let mut v: Vec<String> = s
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        v.sort();
        v
    };
    // every word of the raw answer survives formatting
    assert_eq!(words(raw), words(&last.chunk));
}

// ── pdf flow ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_turn_without_document_is_single_terminal_error() {
    let provider = ScriptedProvider::new(vec![], vec![]);
    let h = harness(provider, true);

    let before = h.sessions.history("s2").len();
    let events = run_turn(&h, request("what is this about?", "s2", Some(ChatMode::Pdf))).await;

    assert_eq!(events.len(), 1);
    assert!(events[0].is_error);
    assert!(events[0].done);
    assert!(events[0].chunk.contains("upload a PDF"));
    // no provider traffic at all
    assert_eq!(h.provider.send_count(), 0);
    // history gained only the step-2 append
    assert_eq!(h.sessions.history("s2").len(), before + 1);
}

#[tokio::test]
async fn pdf_turn_skips_researching_phase() {
    let provider = ScriptedProvider::new(
        vec![text_response("formatted pdf answer")],
        vec![StreamScript::Events(vec![delta("pdf answer"), done()])],
    );
    let h = harness(provider, true);
    h.docs
        .ingest_text("s2", "the report covers quarterly earnings\n\nand staffing")
        .await
        .expect("ingest");

    let events = run_turn(&h, request("what were earnings?", "s2", Some(ChatMode::Pdf))).await;

    assert!(!events.iter().any(|e| e.phase == Some(Phase::Researching)));
    assert_eq!(events[0], TurnEvent::marker(Phase::Streaming));
    assert!(events.iter().any(|e| e.phase == Some(Phase::StreamingComplete)));
    let last = events.last().expect("events");
    assert_eq!(last.phase, Some(Phase::FormattedComplete));
    assert!(last.done);
}

#[tokio::test]
async fn mode_persists_across_turns_without_hint() {
    let provider = ScriptedProvider::new(vec![], vec![]);
    let h = harness(provider, true);

    // first turn pins the session to pdf mode (and errors: no document)
    let first = run_turn(&h, request("question one", "s3", Some(ChatMode::Pdf))).await;
    assert!(first[0].is_error);

    // second turn has no hint — still routed through the pdf path
    let second = run_turn(&h, request("question two", "s3", None)).await;
    assert_eq!(second.len(), 1);
    assert!(second[0].chunk.contains("upload a PDF"));
    assert_eq!(h.sessions.mode("s3"), Some(ChatMode::Pdf));
}

// ── configuration gate ───────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_key_short_circuits_before_any_stage() {
    let provider = ScriptedProvider::new(vec![], vec![]);
    let h = harness(provider, false);

    let events = run_turn(&h, request("hello", "s1", None)).await;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_error && events[0].done);
    assert!(events[0].chunk.contains("API key not configured"));
    assert_eq!(h.provider.send_count(), 0);
    // the step-2 append still happened (accepted quirk)
    assert_eq!(h.sessions.history("s1").len(), 1);
}

// ── cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn pre_cancelled_turn_emits_nothing() {
    let provider = ScriptedProvider::new(vec![], vec![]);
    let h = harness(provider, true);

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    cancel.cancel();
    h.orchestrator
        .handle_turn(request("hello", "s1", None), tx, cancel)
        .await;

    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn cancellation_mid_stream_stops_all_output() {
    let provider = ScriptedProvider::new(
        vec![text_response("")],
        vec![StreamScript::EventsThenHang(vec![delta("first chunk")])],
    );
    let h = harness(provider, true);

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let orch = Arc::clone(&h.orchestrator);
    let turn_cancel = cancel.clone();
    let turn = tokio::spawn(async move {
        orch.handle_turn(request("hello", "s1", None), tx, turn_cancel)
            .await;
    });

    // consume events until the first streamed chunk arrives, then cancel
    let mut seen_chunk = false;
    while let Some(ev) = rx.recv().await {
        if ev.phase == Some(Phase::Streaming) && !ev.chunk.is_empty() {
            assert_eq!(ev.chunk, "first chunk");
            seen_chunk = true;
            cancel.cancel();
            break;
        }
    }
    assert!(seen_chunk, "never saw the streamed chunk");

    // the turn task winds down without emitting anything further
    turn.await.expect("turn task completed");
    assert!(rx.recv().await.is_none(), "event emitted after cancellation");
}
