use thiserror::Error;

/// Structured error kinds for the turn pipeline.
///
/// Each variant corresponds to one row of the terminal-event mapping in the
/// orchestrator, so converting an error into a user-visible event is a total
/// match rather than string inspection.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScoutError {
    /// Short stable code string, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            ScoutError::Config(_) => "CONFIG_ERROR",
            ScoutError::Tool(_) => "TOOL_ERROR",
            ScoutError::Stream(_) => "STREAM_ERROR",
            ScoutError::Retrieval(_) => "RETRIEVAL_ERROR",
            ScoutError::Session(_) => "SESSION_ERROR",
            ScoutError::Serialization(_) => "SERIALIZATION_ERROR",
            ScoutError::Io(_) => "IO_ERROR",
            ScoutError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
