use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use agora_config::{Rosters, Settings};
use agora_core::{initialize, AgentSystem, Registry};
use agora_providers::build_provider;

use crate::{Cli, Command};

/// Load settings and rosters, build the completion backend and bring every
/// agent and channel up.
pub async fn boot(config_dir: &Path, settings_path: &Path) -> Result<AgentSystem> {
    let settings = Settings::load(Some(settings_path))
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    let completion = build_provider(&settings.completion)?;
    info!(provider = %completion.name(), "Completion backend ready");

    let rosters = Rosters::load_dir(config_dir)
        .with_context(|| format!("Failed to load rosters from {}", config_dir.display()))?;

    let registry = Arc::new(Registry::new(completion, settings.agent.clone()));
    initialize(&registry, &rosters).await?;
    Ok(AgentSystem::new(registry))
}

pub(crate) async fn execute(cli: Cli) -> Result<()> {
    let system = boot(&cli.config_dir, &cli.settings).await?;

    match cli.command {
        Command::Run { for_secs } => {
            match for_secs {
                Some(secs) => {
                    info!("Running for {} seconds", secs);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                        signal = tokio::signal::ctrl_c() => signal?,
                    }
                }
                None => {
                    info!("Running until Ctrl-C");
                    tokio::signal::ctrl_c().await?;
                }
            }
            info!("Shutting down");
        }
        Command::Agents => print_json(&system.list_agents().await)?,
        Command::Channels => print_json(&system.list_channels().await)?,
        Command::Send {
            agent,
            channel,
            content,
            settle_ms,
        } => {
            let response = system.send_as_agent(&agent, &channel, &content).await;
            tokio::time::sleep(Duration::from_millis(settle_ms)).await;
            let history = match system.registry().get_agent(&agent).await {
                Some(agent) => agent.history(&channel),
                None => Vec::new(),
            };
            print_json(&json!({ "response": response, "history": history }))?;
        }
        Command::Share {
            agent,
            channel_id,
            name,
            description,
            on,
        } => {
            let response = system
                .create_and_share_channel(&agent, &channel_id, &name, &description, &on)
                .await;
            print_json(&response)?;
        }
    }

    system.shutdown().await;
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
