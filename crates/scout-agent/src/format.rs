//! Reformatting stage.
//!
//! Takes the complete streamed answer and asks the model for a
//! presentation-polished version: layout only, wording preserved. Failure
//! here never blocks delivery — the caller gets the original text back.

use tracing::warn;

use crate::provider::{ChatRequest, LlmProvider};

const FORMAT_SYSTEM_PROMPT: &str = "You are a formatting assistant. Rewrite the answer you are \
given as clean, well-structured markdown: normalize headings, spacing, lists, tables, and link \
formatting. You must not add, remove, or reword any information — change layout only. Return \
only the reformatted answer with no commentary.";

/// Produce the polished version of `text`, or `text` unchanged on any
/// failure (provider error, empty response).
pub async fn reformat(provider: &dyn LlmProvider, model: &str, max_tokens: u32, text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let req = ChatRequest::new(model, FORMAT_SYSTEM_PROMPT, max_tokens).user(text);
    match provider.send(&req).await {
        Ok(resp) if !resp.content.trim().is_empty() => resp.content,
        Ok(_) => {
            warn!("reformatting returned empty content — keeping raw answer");
            text.to_string()
        }
        Err(e) => {
            warn!(error = %e, "reformatting failed — keeping raw answer");
            text.to_string()
        }
    }
}
