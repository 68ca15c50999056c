use serde::Serialize;

use scout_core::ChatMode;

/// Per-session conversational state.
///
/// Sessions are lazy-created on first message and live for the life of the
/// process; nothing is persisted. History holds user utterances only — the
/// generation prompt only needs the user's side as context anchors, so
/// assistant answers are never recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Active content pipeline; updated whenever a request carries a hint.
    pub mode: ChatMode,
    /// Prior user utterances, insertion order. Unbounded — no eviction.
    pub history: Vec<String>,
}

impl Session {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            mode,
            history: Vec::new(),
        }
    }
}
