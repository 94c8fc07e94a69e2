//! Directory of every channel and agent in the process.
//!
//! The registry is the only place channels and agents are created, and the
//! only authority for resolving ids. Unknown ids resolve to `None`; callers
//! routing messages treat that as a silent no-op.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use agora_config::{AgentConfig, AgentSettings, ChannelConfig};
use agora_providers::CompletionPort;

use crate::agent::{Agent, AgentSummary};
use crate::channel::{Channel, ChannelSummary};
use crate::error::{AgoraError, Result};
use crate::prompt::PromptTemplates;

pub struct Registry {
    agents: RwLock<HashMap<String, Agent>>,
    channels: RwLock<HashMap<String, Arc<Channel>>>,
    templates: RwLock<Option<Arc<PromptTemplates>>>,
    completion: Arc<dyn CompletionPort>,
    agent_settings: AgentSettings,
}

impl Registry {
    pub fn new(completion: Arc<dyn CompletionPort>, agent_settings: AgentSettings) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            templates: RwLock::new(None),
            completion,
            agent_settings,
        }
    }

    /// Install the prompt templates used by agents created afterwards.
    pub async fn set_prompt_templates(&self, templates: PromptTemplates) {
        *self.templates.write().await = Some(Arc::new(templates));
    }

    /// Create and register an agent.
    ///
    /// Fails with [`AgoraError::TemplatesNotInstalled`] when called before
    /// [`Registry::set_prompt_templates`].
    pub async fn create_agent(&self, config: &AgentConfig) -> Result<Agent> {
        let templates = self
            .templates
            .read()
            .await
            .clone()
            .ok_or(AgoraError::TemplatesNotInstalled)?;

        let mut agents = self.agents.write().await;
        if agents.contains_key(&config.id) {
            return Err(AgoraError::AgentExists(config.id.clone()));
        }

        let agent = Agent::new(
            config,
            self.completion.clone(),
            templates,
            &self.agent_settings,
        );
        agents.insert(config.id.clone(), agent.clone());
        info!(agent = %config.id, role = %config.role, "Created agent");
        Ok(agent)
    }

    /// Create and register a channel. Channel ids are never reused.
    pub async fn create_channel(&self, config: &ChannelConfig) -> Result<Arc<Channel>> {
        let mut channels = self.channels.write().await;
        if channels.contains_key(&config.id) {
            return Err(AgoraError::ChannelExists(config.id.clone()));
        }

        let channel = Arc::new(Channel::new(
            config.id.clone(),
            config.name.clone(),
            config.description.clone(),
            config.public,
        ));
        channels.insert(config.id.clone(), channel.clone());
        debug!(channel = %config.id, public = config.public, "Created channel");
        Ok(channel)
    }

    pub async fn get_agent(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.get(id).cloned()
    }

    pub async fn get_channel(&self, id: &str) -> Option<Arc<Channel>> {
        self.channels.read().await.get(id).cloned()
    }

    /// All agents, sorted by id.
    pub async fn agents(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.id().cmp(b.id()));
        agents
    }

    pub async fn list_agents(&self) -> Vec<AgentSummary> {
        self.agents().await.iter().map(Agent::summary).collect()
    }

    /// Channel listings, sorted by id.
    pub async fn list_channels(&self) -> Vec<ChannelSummary> {
        let mut summaries: Vec<ChannelSummary> = self
            .channels
            .read()
            .await
            .values()
            .map(|channel| channel.summary())
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("completion", &self.completion.name())
            .finish_non_exhaustive()
    }
}
