use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

/// User-facing message for a missing or invalid credential.
pub const KEY_NOT_CONFIGURED: &str =
    "API key not configured. Please set llm.api_key in scout.toml or the SCOUT_LLM__API_KEY environment variable.";

/// Lazily validates the model-service credential and caches the verdict.
///
/// A cheap format check short-circuits obviously missing keys; otherwise a
/// single probe against the provider's model listing decides, and the result
/// (whatever it was) sticks for the life of the process.
pub struct KeyValidator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    cached: RwLock<Option<bool>>,
}

impl KeyValidator {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            cached: RwLock::new(None),
        }
    }

    /// Construct with a pre-seeded verdict, skipping the network probe.
    /// Used by tests and deployments that validate out of band.
    pub fn prevalidated(valid: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: String::new(),
            base_url: String::new(),
            cached: RwLock::new(Some(valid)),
        }
    }

    fn has_valid_format(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Whether the credential is usable. First call may hit the network;
    /// subsequent calls return the cached verdict.
    pub async fn is_valid(&self) -> bool {
        if let Some(cached) = *self.cached.read().await {
            return cached;
        }

        let mut guard = self.cached.write().await;
        // another task may have validated while we waited for the lock
        if let Some(cached) = *guard {
            return cached;
        }

        if !self.has_valid_format() {
            warn!("API key failed basic format validation (missing or empty)");
            *guard = Some(false);
            return false;
        }

        let valid = self.probe().await;
        *guard = Some(valid);
        valid
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        info!("validating API key against the provider");
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("API key validated successfully");
                true
            }
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "API key validation failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "API key validation request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_key_is_invalid_without_network() {
        let validator = KeyValidator::new(String::new(), "http://unreachable.invalid".into());
        assert!(!validator.is_valid().await);
        // cached — second call also returns instantly
        assert!(!validator.is_valid().await);
    }

    #[tokio::test]
    async fn whitespace_key_fails_format_check() {
        let validator = KeyValidator::new("   ".into(), "http://unreachable.invalid".into());
        assert!(!validator.is_valid().await);
    }

    #[tokio::test]
    async fn prevalidated_verdict_sticks() {
        let validator = KeyValidator::prevalidated(true);
        assert!(validator.is_valid().await);
    }
}
