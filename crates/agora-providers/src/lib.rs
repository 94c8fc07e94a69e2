//! Text completion backends for agora agents.
//!
//! Agents treat completion as an opaque capability: hand over a prompt, get
//! text back or an error. This crate defines that seam ([`CompletionPort`])
//! and ships the backends selectable from settings:
//!
//! - [`SimulatedProvider`]: deterministic keyword-driven replies, no network.
//! - [`OpenAiCompatibleProvider`]: any `/chat/completions` endpoint.
//! - [`RetryingProvider`]: wraps another backend with a per-attempt timeout
//!   and exponential backoff.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agora_config::{CompletionSettings, ProviderKind};

pub mod openai;
pub mod retry;
pub mod simulated;

pub use openai::OpenAiCompatibleProvider;
pub use retry::{RetryPolicy, RetryingProvider};
pub use simulated::SimulatedProvider;

/// Turns a prompt into reply text.
///
/// Implementations may take arbitrary wall-clock time. Callers must not hold
/// locks across `complete`.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: CompletionPort + ?Sized> CompletionPort for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the backend described by `settings`, wrapped in the retry decorator.
pub fn build_provider(settings: &CompletionSettings) -> Result<Arc<dyn CompletionPort>> {
    let policy = RetryPolicy::from(&settings.retry);
    let timeout = std::time::Duration::from_millis(settings.timeout_ms);

    let provider: Arc<dyn CompletionPort> = match settings.provider {
        ProviderKind::Simulated => Arc::new(RetryingProvider::new(
            SimulatedProvider::new(),
            policy,
            timeout,
        )),
        ProviderKind::OpenAi => {
            let api_key = settings
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("completion.api_key is required for openai"))?;
            let inner = OpenAiCompatibleProvider::new(
                api_key,
                settings.model.clone(),
                settings.base_url.clone(),
                Some(settings.max_tokens),
                Some(settings.temperature),
            )?;
            Arc::new(RetryingProvider::new(inner, policy, timeout))
        }
    };

    tracing::debug!("Built completion provider '{}'", provider.name());
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_simulated_by_default() {
        let provider = build_provider(&CompletionSettings::default()).unwrap();
        assert_eq!(provider.name(), "simulated");
        let reply = provider.complete("tell me about quantum states").await.unwrap();
        assert!(reply.contains("physics"));
    }

    #[test]
    fn test_build_openai_without_key_fails() {
        let settings = CompletionSettings {
            provider: ProviderKind::OpenAi,
            ..Default::default()
        };
        assert!(build_provider(&settings).is_err());
    }

    #[test]
    fn test_build_openai_with_key() {
        let settings = CompletionSettings {
            provider: ProviderKind::OpenAi,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = build_provider(&settings).unwrap();
        assert_eq!(provider.name(), "openai");
    }
}
