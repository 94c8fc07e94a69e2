//! Shared fixtures for agora-core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use agora_config::{AgentConfig, AgentSettings, ChannelConfig};
use agora_core::{Agent, Channel, ChannelReceiver, Envelope, PromptTemplates, Registry};
use agora_providers::CompletionPort;

pub const TEMPLATE: &str =
    "{{systemPrompt}}\n[{{agentName}} / {{agentRole}} in {{channelName}}]\n{{history}}\n{{sender}}: {{message}}";

/// Completion double that records prompts and can fail or stall on demand.
///
/// - Prompts whose final line contains `fail_on` produce an error.
/// - Prompts whose final line contains `gate_on` wait for [`ScriptedCompletion::release`].
#[derive(Default)]
pub struct ScriptedCompletion {
    prompts: Mutex<Vec<String>>,
    fail_on: Option<String>,
    gate_on: Option<String>,
    gate: Notify,
}

impl ScriptedCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(trigger: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(trigger.to_string()),
            ..Default::default()
        })
    }

    pub fn gated_on(trigger: &str) -> Arc<Self> {
        Arc::new(Self {
            gate_on: Some(trigger.to_string()),
            ..Default::default()
        })
    }

    /// Let one stalled completion continue.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

fn last_line(prompt: &str) -> &str {
    prompt.lines().last().unwrap_or_default()
}

#[async_trait]
impl CompletionPort for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        let trigger = last_line(prompt);

        if self.gate_on.as_deref().is_some_and(|g| trigger.contains(g)) {
            self.gate.notified().await;
        }
        if self.fail_on.as_deref().is_some_and(|f| trigger.contains(f)) {
            return Err(anyhow!("scripted failure"));
        }
        Ok(format!("reply #{} to <{}>", call, trigger))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub async fn registry_with(completion: Arc<ScriptedCompletion>) -> Arc<Registry> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("agora_core=debug")
        .with_test_writer()
        .try_init();

    let registry = Registry::new(completion, AgentSettings::default());
    registry
        .set_prompt_templates(PromptTemplates::new(TEMPLATE, "Welcome to {{channelName}}"))
        .await;
    Arc::new(registry)
}

pub async fn add_agent(registry: &Registry, id: &str) -> Agent {
    let mut name = id.to_string();
    name[..1].make_ascii_uppercase();
    registry
        .create_agent(&AgentConfig {
            id: id.to_string(),
            name,
            role: "Researcher".to_string(),
            system_prompt: format!("You are {}.", id),
        })
        .await
        .unwrap()
}

pub async fn add_channel(registry: &Registry, id: &str) -> Arc<Channel> {
    registry
        .create_channel(&ChannelConfig {
            id: id.to_string(),
            name: format!("#{}", id),
            description: format!("{} channel", id),
            public: true,
        })
        .await
        .unwrap()
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// Next envelope on an observer stream, failing the test after five seconds.
pub async fn next(observer: &mut ChannelReceiver) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), observer.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("channel stream ended")
}

/// Assert nothing more arrives on `observer` within a short window.
pub async fn assert_quiet(observer: &mut ChannelReceiver) {
    let extra = tokio::time::timeout(Duration::from_millis(200), observer.recv()).await;
    if let Ok(Some(envelope)) = extra {
        panic!(
            "unexpected message from {}: {}",
            envelope.sender_id,
            envelope.message.content()
        );
    }
}

pub fn contents(agent: &Agent, channel_id: &str) -> Vec<String> {
    agent
        .history(channel_id)
        .into_iter()
        .map(|entry| entry.content)
        .collect()
}
