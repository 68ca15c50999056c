use std::sync::Arc;

use crate::provider::LlmProvider;
use crate::validator::KeyValidator;

/// Central agent runtime — holds the LLM provider, the active model, and
/// the credential validator. Shared across all turns via Arc in AppState.
pub struct AgentRuntime {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    validator: KeyValidator,
}

impl AgentRuntime {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: String,
        max_tokens: u32,
        validator: KeyValidator,
    ) -> Self {
        Self {
            provider,
            model,
            max_tokens,
            validator,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn validator(&self) -> &KeyValidator {
        &self.validator
    }
}
