use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("PDF parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocError>;
