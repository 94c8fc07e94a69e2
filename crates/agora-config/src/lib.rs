//! Configuration management for agora.
//!
//! Two kinds of configuration feed the system:
//!
//! - **Rosters**: declarative YAML files describing the agents, channels,
//!   subscriptions, seed messages and prompt templates to build at boot.
//! - **Settings**: runtime tuning (completion backend, history window) layered
//!   from built-in defaults, an optional TOML file and `AGORA__*` environment
//!   variables.

mod error;
pub mod roster;
pub mod settings;

pub use error::ConfigError;
pub use roster::{
    AgentConfig, ChannelConfig, MessageConfig, PromptTemplateConfig, Rosters, SubscriptionConfig,
};
pub use settings::{
    AgentSettings, CompletionSettings, ProviderKind, RetrySettings, Settings,
};
