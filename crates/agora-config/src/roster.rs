//! Declarative rosters loaded at boot.
//!
//! Each roster lives in its own YAML file inside a configuration directory and
//! uses kebab-case keys:
//!
//! | File | Top-level key |
//! |------|---------------|
//! | `agents.yml` | `agents` |
//! | `channels.yml` | `channels` |
//! | `subscriptions.yml` | `subscriptions` |
//! | `initial-messages.yml` | `initial-messages` |
//! | `prompt-templates.yml` | `templates` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

pub const AGENTS_FILE: &str = "agents.yml";
pub const CHANNELS_FILE: &str = "channels.yml";
pub const SUBSCRIPTIONS_FILE: &str = "subscriptions.yml";
pub const INITIAL_MESSAGES_FILE: &str = "initial-messages.yml";
pub const PROMPT_TEMPLATES_FILE: &str = "prompt-templates.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub role: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubscriptionConfig {
    pub agent_id: String,
    pub channel_id: String,
}

/// A seed message replayed once at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessageConfig {
    pub channel_id: String,
    pub agent_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PromptTemplateConfig {
    pub agent_response: String,
    #[serde(default)]
    pub channel_welcome: String,
}

#[derive(Deserialize)]
struct AgentsFile {
    agents: Vec<AgentConfig>,
}

#[derive(Deserialize)]
struct ChannelsFile {
    channels: Vec<ChannelConfig>,
}

#[derive(Deserialize)]
struct SubscriptionsFile {
    #[serde(default)]
    subscriptions: Vec<SubscriptionConfig>,
}

#[derive(Deserialize)]
struct InitialMessagesFile {
    #[serde(default, rename = "initial-messages")]
    initial_messages: Vec<MessageConfig>,
}

#[derive(Deserialize)]
struct TemplatesFile {
    templates: PromptTemplateConfig,
}

/// All five rosters, as read from one configuration directory.
#[derive(Debug, Clone)]
pub struct Rosters {
    pub agents: Vec<AgentConfig>,
    pub channels: Vec<ChannelConfig>,
    pub subscriptions: Vec<SubscriptionConfig>,
    pub initial_messages: Vec<MessageConfig>,
    pub templates: PromptTemplateConfig,
}

impl Rosters {
    /// Load every roster file from `dir`. All five files must exist.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let agents: AgentsFile = read_yaml(&dir.join(AGENTS_FILE))?;
        let channels: ChannelsFile = read_yaml(&dir.join(CHANNELS_FILE))?;
        let subscriptions: SubscriptionsFile = read_yaml(&dir.join(SUBSCRIPTIONS_FILE))?;
        let messages: InitialMessagesFile = read_yaml(&dir.join(INITIAL_MESSAGES_FILE))?;
        let templates: TemplatesFile = read_yaml(&dir.join(PROMPT_TEMPLATES_FILE))?;

        Ok(Self {
            agents: agents.agents,
            channels: channels.channels,
            subscriptions: subscriptions.subscriptions,
            initial_messages: messages.initial_messages,
            templates: templates.templates,
        })
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
