use serde::{Deserialize, Serialize};

/// Which content pipeline a session is currently routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Tool-augmented web research over the live internet.
    #[default]
    Research,
    /// Question answering grounded in an uploaded PDF.
    Pdf,
}

/// Pipeline stage tag carried on streamed events.
///
/// A turn only ever moves forward through these: `researching` (research
/// mode only) → `streaming` → `streaming-complete` → `formatted-complete`.
/// Events with no stage (errors, for instance) carry `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Researching,
    Streaming,
    StreamingComplete,
    FormattedComplete,
}

/// One frame of the server-to-client event stream for a turn.
///
/// Wire shape: `{ "chunk": "...", "done": false, "status": "streaming" }`
/// with `status` omitted when there is no phase and `error` omitted when
/// false. Exactly one event per non-cancelled turn has `done = true`, and it
/// is the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub chunk: String,
    #[serde(default)]
    pub done: bool,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(rename = "error", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TurnEvent {
    /// Empty-text marker announcing a phase transition.
    pub fn marker(phase: Phase) -> Self {
        Self {
            chunk: String::new(),
            done: false,
            phase: Some(phase),
            is_error: false,
        }
    }

    /// One streamed fragment of the answer.
    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            chunk: text.into(),
            done: false,
            phase: Some(Phase::Streaming),
            is_error: false,
        }
    }

    /// The terminal event carrying the polished answer.
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            chunk: text.into(),
            done: true,
            phase: Some(Phase::FormattedComplete),
            is_error: false,
        }
    }

    /// Terminal error event. No further events follow it.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            chunk: message.into(),
            done: true,
            phase: None,
            is_error: true,
        }
    }
}

/// One inbound user message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    /// Opaque session key; the gateway substitutes a default when absent.
    pub session_id: Option<String>,
    /// Optional mode switch; persists on the session for subsequent turns.
    pub mode: Option<ChatMode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(Phase::StreamingComplete).unwrap(),
            serde_json::json!("streaming-complete")
        );
        assert_eq!(
            serde_json::to_value(Phase::FormattedComplete).unwrap(),
            serde_json::json!("formatted-complete")
        );
    }

    #[test]
    fn event_wire_shape_omits_absent_fields() {
        let json = serde_json::to_string(&TurnEvent::chunk("hi")).unwrap();
        assert_eq!(json, r#"{"chunk":"hi","done":false,"status":"streaming"}"#);

        let json = serde_json::to_string(&TurnEvent::error("boom")).unwrap();
        assert_eq!(json, r#"{"chunk":"boom","done":true,"error":true}"#);
    }

    #[test]
    fn marker_carries_empty_chunk() {
        let ev = TurnEvent::marker(Phase::Researching);
        assert!(ev.chunk.is_empty());
        assert!(!ev.done);
        assert_eq!(ev.phase, Some(Phase::Researching));
    }

    #[test]
    fn turn_request_accepts_camel_case() {
        let req: TurnRequest = serde_json::from_str(
            r#"{"message":"Acme Corp","sessionId":"s1","mode":"research"}"#,
        )
        .unwrap();
        assert_eq!(req.session_id.as_deref(), Some("s1"));
        assert_eq!(req.mode, Some(ChatMode::Research));
    }

    #[test]
    fn mode_hint_is_optional() {
        let req: TurnRequest = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert!(req.session_id.is_none());
        assert!(req.mode.is_none());
    }
}
