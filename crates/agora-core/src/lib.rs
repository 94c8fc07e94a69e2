//! Channel-based multi-agent messaging fabric.
//!
//! Agents talk only through named broadcast [`Channel`]s. Each subscription
//! runs its own delivery task; agents record what they hear and reply through
//! a [`CompletionPort`](agora_providers::CompletionPort), flagging replies so
//! they do not set off further automatic replies.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agora_config::{AgentConfig, AgentSettings, ChannelConfig};
//! use agora_core::{PromptTemplates, Registry};
//! use agora_providers::SimulatedProvider;
//!
//! # async fn example() -> agora_core::Result<()> {
//! let registry = Registry::new(Arc::new(SimulatedProvider::new()), AgentSettings::default());
//! registry.set_prompt_templates(PromptTemplates::new("{{sender}} said: {{message}}", "")).await;
//!
//! let general = registry.create_channel(&ChannelConfig {
//!     id: "general".into(),
//!     name: "General".into(),
//!     description: "Open discussion".into(),
//!     public: true,
//! }).await?;
//! let alice = registry.create_agent(&AgentConfig {
//!     id: "alice".into(),
//!     name: "Alice".into(),
//!     role: "Mathematician".into(),
//!     system_prompt: "You think in proofs.".into(),
//! }).await?;
//!
//! alice.subscribe_to_channel(general);
//! alice.send_message("general", "hi")?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod agent;
pub mod bootstrap;
pub mod channel;
mod error;
pub mod message;
pub mod prompt;
pub mod registry;

pub use admin::{AdminResponse, AgentSystem};
pub use agent::{Agent, AgentSummary, HistoryEntry, ShareOutcome};
pub use bootstrap::{initialize, BootSummary};
pub use channel::{Channel, ChannelReceiver, ChannelSummary, Envelope};
pub use error::{AgoraError, Result};
pub use message::{Message, ACTION_KEY, AUTO_RESPONSE_KEY, CHANNEL_SHARE_ACTION};
pub use prompt::{PromptContext, PromptTemplates};
pub use registry::Registry;
