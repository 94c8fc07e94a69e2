//! Runtime settings layered with the `config` crate.
//!
//! Precedence, lowest to highest: built-in defaults, an optional TOML file,
//! then environment variables of the form `AGORA__COMPLETION__MODEL`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Default number of history entries fed into a reply prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Default timeout for a single completion attempt.
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 30_000;

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "AGORA";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub agent: AgentSettings,
}

/// Which completion backend to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Simulated,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Timeout for one completion attempt (milliseconds).
    pub timeout_ms: u64,
    pub retry: RetrySettings,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Simulated,
            api_key: None,
            model: None,
            base_url: None,
            max_tokens: 1024,
            temperature: 0.7,
            timeout_ms: DEFAULT_COMPLETION_TIMEOUT_MS,
            retry: RetrySettings::default(),
        }
    }
}

/// Retry policy applied by the completion decorator.
///
/// The default of one attempt means "no retry".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 { 1 }
fn default_initial_delay() -> u64 { 100 }
fn default_backoff_multiplier() -> f64 { 2.0 }
fn default_max_delay() -> u64 { 5000 }

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// How many recent history entries are rendered into a reply prompt.
    pub history_window: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    ///
    /// A `path` that does not exist is ignored so that a default install
    /// runs without any settings file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.history_window == 0 {
            return Err(ConfigError::Invalid(
                "agent.history_window must be at least 1".to_string(),
            ));
        }
        if self.completion.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "completion.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be within 0.0..=2.0, got {}",
                self.completion.temperature
            )));
        }
        if self.completion.provider == ProviderKind::OpenAi && self.completion.api_key.is_none() {
            return Err(ConfigError::Invalid(
                "completion.api_key is required for the openai provider".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.completion.provider, ProviderKind::Simulated);
        assert_eq!(settings.completion.max_tokens, 1024);
        assert_eq!(settings.completion.retry.max_attempts, 1);
        assert_eq!(settings.agent.history_window, DEFAULT_HISTORY_WINDOW);
    }

    #[test]
    #[serial]
    fn test_missing_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(Some(&dir.path().join("agora.toml"))).unwrap();
        assert_eq!(settings.completion.timeout_ms, DEFAULT_COMPLETION_TIMEOUT_MS);
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agora.toml");
        std::fs::write(
            &path,
            r#"
[completion]
provider = "openai"
api_key = "sk-test"
model = "gpt-4o-mini"

[completion.retry]
max_attempts = 3

[agent]
history_window = 4
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.completion.provider, ProviderKind::OpenAi);
        assert_eq!(settings.completion.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.completion.retry.max_attempts, 3);
        assert_eq!(settings.completion.retry.initial_delay_ms, 100);
        assert_eq!(settings.agent.history_window, 4);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agora.toml");
        std::fs::write(&path, "[agent]\nhistory_window = 4\n").unwrap();

        std::env::set_var("AGORA__AGENT__HISTORY_WINDOW", "7");
        let result = Settings::load(Some(&path));
        std::env::remove_var("AGORA__AGENT__HISTORY_WINDOW");

        assert_eq!(result.unwrap().agent.history_window, 7);
    }

    #[test]
    fn test_openai_requires_api_key() {
        let mut settings = Settings::default();
        settings.completion.provider = ProviderKind::OpenAi;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        settings.completion.api_key = Some("sk-test".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_history_window_rejected() {
        let mut settings = Settings::default();
        settings.agent.history_window = 0;
        assert!(settings.validate().is_err());
    }
}
