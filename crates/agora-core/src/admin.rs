//! Administrative operations for an outer transport (HTTP, CLI, ...).
//!
//! Every operation reports unknown ids as a structured failure instead of an
//! error, so a bad request never disturbs the messaging fabric.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::agent::{AgentSummary, ShareOutcome};
use crate::channel::ChannelSummary;
use crate::error::AgoraError;
use crate::registry::Registry;

/// Outcome of an administrative request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

impl From<AgoraError> for AdminResponse {
    fn from(err: AgoraError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Facade over a [`Registry`] exposing the administrative surface.
#[derive(Debug, Clone)]
pub struct AgentSystem {
    registry: Arc<Registry>,
}

impl AgentSystem {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn list_agents(&self) -> Vec<AgentSummary> {
        self.registry.list_agents().await
    }

    pub async fn list_channels(&self) -> Vec<ChannelSummary> {
        self.registry.list_channels().await
    }

    /// Send `content` on `channel_id` as `agent_id`.
    ///
    /// Succeeds even when the agent is not subscribed to the channel, in which
    /// case nothing is published.
    pub async fn send_as_agent(&self, agent_id: &str, channel_id: &str, content: &str) -> AdminResponse {
        let Some(agent) = self.registry.get_agent(agent_id).await else {
            return AgoraError::UnknownAgent(agent_id.to_string()).into();
        };
        match agent.send_message(channel_id, content) {
            Ok(sent) => {
                debug!(agent = %agent_id, channel = %channel_id, sent, "Admin send");
                AdminResponse::ok()
            }
            Err(e) => e.into(),
        }
    }

    pub async fn create_and_share_channel(
        &self,
        agent_id: &str,
        new_channel_id: &str,
        name: &str,
        description: &str,
        share_on_channel_id: &str,
    ) -> AdminResponse {
        let Some(agent) = self.registry.get_agent(agent_id).await else {
            return AgoraError::UnknownAgent(agent_id.to_string()).into();
        };
        match agent
            .create_and_share_channel(
                new_channel_id,
                name,
                description,
                share_on_channel_id,
                &self.registry,
            )
            .await
        {
            Ok(ShareOutcome::Shared) | Ok(ShareOutcome::RecipientNotSubscribed) => AdminResponse::ok(),
            Err(e) => e.into(),
        }
    }

    /// Subscribe an agent to an existing channel, e.g. one it learned about
    /// from a shared reference.
    pub async fn subscribe_agent(&self, agent_id: &str, channel_id: &str) -> AdminResponse {
        let Some(agent) = self.registry.get_agent(agent_id).await else {
            return AgoraError::UnknownAgent(agent_id.to_string()).into();
        };
        let Some(channel) = self.registry.get_channel(channel_id).await else {
            return AgoraError::UnknownChannel(channel_id.to_string()).into();
        };
        agent.subscribe_to_channel(channel);
        AdminResponse::ok()
    }

    /// Shut every agent down. Directory entries stay for inspection.
    pub async fn shutdown(&self) {
        for agent in self.registry.agents().await {
            agent.shutdown();
        }
    }
}
