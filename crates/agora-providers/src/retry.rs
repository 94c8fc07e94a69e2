//! Retry and timeout decorator for completion backends.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use agora_config::RetrySettings;

use crate::CompletionPort;

/// Exponential backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay_ms: settings.initial_delay_ms,
            backoff_multiplier: settings.backoff_multiplier,
            max_delay_ms: settings.max_delay_ms,
        }
    }
}

impl RetryPolicy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Wraps a backend with a per-attempt timeout and retry on failure.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
    timeout: Duration,
}

impl<P: CompletionPort> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            timeout,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: CompletionPort> CompletionPort for RetryingProvider<P> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut last_error = anyhow!("no completion attempts were made");

        for attempt in 0..self.policy.max_attempts {
            match tokio::time::timeout(self.timeout, self.inner.complete(prompt)).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => last_error = e,
                Err(_) => {
                    last_error = anyhow!(
                        "completion timed out after {}ms",
                        self.timeout.as_millis()
                    )
                }
            }

            if attempt + 1 < self.policy.max_attempts {
                warn!(
                    "Completion via '{}' failed, attempt {}/{}: {}",
                    self.inner.name(),
                    attempt + 1,
                    self.policy.max_attempts,
                    last_error
                );
                tokio::time::sleep(self.policy.delay_for_attempt(attempt)).await;
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
