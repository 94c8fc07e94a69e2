//! Builds a running system from configuration rosters.

use tracing::{info, warn};

use agora_config::Rosters;

use crate::error::Result;
use crate::prompt::PromptTemplates;
use crate::registry::Registry;

/// Counts of what [`initialize`] set up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootSummary {
    pub agents: usize,
    pub channels: usize,
    pub subscriptions: usize,
    pub seeds: usize,
}

/// Populate `registry` from `rosters`.
///
/// Order: templates, channels, agents, subscriptions, then seed messages.
/// Subscriptions and seeds naming an unknown agent or channel are skipped
/// with a warning; duplicate ids abort the boot.
pub async fn initialize(registry: &Registry, rosters: &Rosters) -> Result<BootSummary> {
    let mut summary = BootSummary::default();

    registry
        .set_prompt_templates(PromptTemplates::from(rosters.templates.clone()))
        .await;

    for channel in &rosters.channels {
        registry.create_channel(channel).await?;
        summary.channels += 1;
    }

    for agent in &rosters.agents {
        registry.create_agent(agent).await?;
        summary.agents += 1;
    }

    for subscription in &rosters.subscriptions {
        let agent = registry.get_agent(&subscription.agent_id).await;
        let channel = registry.get_channel(&subscription.channel_id).await;
        match (agent, channel) {
            (Some(agent), Some(channel)) => {
                if agent.subscribe_to_channel(channel) {
                    summary.subscriptions += 1;
                }
            }
            _ => warn!(
                agent = %subscription.agent_id,
                channel = %subscription.channel_id,
                "Skipping subscription with unknown agent or channel"
            ),
        }
    }

    for seed in &rosters.initial_messages {
        let Some(agent) = registry.get_agent(&seed.agent_id).await else {
            warn!(agent = %seed.agent_id, "Skipping seed message from unknown agent");
            continue;
        };
        if agent.send_message(&seed.channel_id, seed.content.clone())? {
            summary.seeds += 1;
        } else {
            warn!(
                agent = %seed.agent_id,
                channel = %seed.channel_id,
                "Seed message not sent, agent is not subscribed to the channel"
            );
        }
    }

    info!(
        agents = summary.agents,
        channels = summary.channels,
        subscriptions = summary.subscriptions,
        seeds = summary.seeds,
        "System initialized with {} agents and {} channels",
        summary.agents,
        summary.channels
    );
    Ok(summary)
}
