//! Conversational agents and their channel subscriptions.
//!
//! Each channel an agent joins gets its own delivery task. The tasks run
//! concurrently and share the agent's state (history, channel handles, known
//! references) behind a single mutex that is never held across an await.
//!
//! Reaction rules, applied per delivered message:
//! 1. Messages the agent itself sent are skipped entirely.
//! 2. Everything else is appended to the channel history; any channel
//!    references it carries are remembered.
//! 3. A reply is generated only when the message is not flagged as an
//!    auto-response. The reply is flagged, so it never triggers a reply
//!    from the agent that receives it.
//!
//! While a delivery task waits on the completion backend, later messages on
//! that channel queue behind it and are processed in order afterwards. Other
//! channels keep flowing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use agora_config::{AgentConfig, AgentSettings, ChannelConfig};
use agora_providers::CompletionPort;

use crate::channel::{Channel, ChannelReceiver, Envelope};
use crate::error::Result;
use crate::message::Message;
use crate::prompt::{PromptContext, PromptTemplates};
use crate::registry::Registry;

/// One line of an agent's per-channel conversation memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
}

/// Read-only projection of an agent for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// Result of [`Agent::create_and_share_channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    /// The new channel was announced on the recipient channel.
    Shared,
    /// The new channel exists and the agent joined it, but the agent holds no
    /// handle for the recipient channel, so nothing was announced.
    RecipientNotSubscribed,
}

/// Live binding of one agent to one channel.
pub(crate) struct Subscription {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    /// Offset of the next message this subscription expects; 0 before any.
    cursor: Arc<AtomicU64>,
}

impl Subscription {
    /// Offset of the last message the delivery task picked up, if any.
    fn last_seen_offset(&self) -> Option<u64> {
        self.cursor.load(Ordering::Acquire).checked_sub(1)
    }

    fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[derive(Default)]
struct AgentState {
    system_prompt: String,
    subscriptions: HashMap<String, Subscription>,
    channels: HashMap<String, Arc<Channel>>,
    history: HashMap<String, Vec<HistoryEntry>>,
    /// Channel ids received as references, in first-seen order.
    known_refs: Vec<String>,
}

impl AgentState {
    fn record(&mut self, channel_id: &str, entry: HistoryEntry) {
        self.history
            .entry(channel_id.to_string())
            .or_default()
            .push(entry);
    }

    fn recent(&self, channel_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.history
            .get(channel_id)
            .map(|entries| entries[entries.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default()
    }

    fn remember_refs(&mut self, refs: &[String]) -> usize {
        let mut added = 0;
        for channel_id in refs {
            if !self.known_refs.contains(channel_id) {
                self.known_refs.push(channel_id.clone());
                added += 1;
            }
        }
        added
    }
}

struct AgentInner {
    id: String,
    name: String,
    role: String,
    completion: Arc<dyn CompletionPort>,
    templates: Arc<PromptTemplates>,
    history_window: usize,
    state: Mutex<AgentState>,
}

/// Handle to an agent. Clones share the same agent.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    pub(crate) fn new(
        config: &AgentConfig,
        completion: Arc<dyn CompletionPort>,
        templates: Arc<PromptTemplates>,
        settings: &AgentSettings,
    ) -> Self {
        Self {
            inner: Arc::new(AgentInner {
                id: config.id.clone(),
                name: config.name.clone(),
                role: config.role.clone(),
                completion,
                templates,
                history_window: settings.history_window,
                state: Mutex::new(AgentState {
                    system_prompt: config.system_prompt.clone(),
                    ..Default::default()
                }),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn role(&self) -> &str {
        &self.inner.role
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.inner.id.clone(),
            name: self.inner.name.clone(),
            role: self.inner.role.clone(),
        }
    }

    pub fn system_prompt(&self) -> String {
        self.inner.state().system_prompt.clone()
    }

    /// Replace the system prompt. Prompts already handed to the completion
    /// backend are unaffected.
    pub fn update_system_prompt(&self, text: impl Into<String>) {
        self.inner.state().system_prompt = text.into();
    }

    /// Join `channel`: register membership, keep its handle and start a
    /// delivery task that sees every message published from now on.
    ///
    /// Returns `false` without doing anything if already subscribed.
    /// Must be called from within a tokio runtime.
    pub fn subscribe_to_channel(&self, channel: Arc<Channel>) -> bool {
        let mut state = self.inner.state();
        if state.subscriptions.contains_key(channel.id()) {
            return false;
        }

        channel.subscribe(&self.inner.id);
        state
            .channels
            .insert(channel.id().to_string(), channel.clone());
        state.history.entry(channel.id().to_string()).or_default();

        // Attach before returning so nothing published after this call is missed.
        let receiver = channel.attach();
        let cancel = CancellationToken::new();
        let cursor = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run_delivery(
            self.inner.clone(),
            channel.clone(),
            receiver,
            cancel.clone(),
            cursor.clone(),
        ));

        state.subscriptions.insert(
            channel.id().to_string(),
            Subscription {
                cancel,
                task,
                cursor,
            },
        );
        info!(agent = %self.inner.id, channel = %channel.id(), "Subscribed");
        true
    }

    /// Leave one channel: stop its delivery task and drop membership.
    /// History for the channel is kept. Returns `false` if not subscribed.
    pub fn unsubscribe(&self, channel_id: &str) -> bool {
        let mut state = self.inner.state();
        let Some(subscription) = state.subscriptions.remove(channel_id) else {
            return false;
        };
        subscription.cancel();
        if let Some(channel) = state.channels.remove(channel_id) {
            channel.unsubscribe(&self.inner.id);
        }
        info!(agent = %self.inner.id, channel = %channel_id, "Unsubscribed");
        true
    }

    /// Publish `content` on `channel_id` as this agent.
    ///
    /// Returns `Ok(false)` and publishes nothing when the agent holds no
    /// handle for the channel.
    pub fn send_message(&self, channel_id: &str, content: impl Into<String>) -> Result<bool> {
        let content = content.into();
        let mut state = self.inner.state();
        let Some(channel) = state.channels.get(channel_id).cloned() else {
            debug!(agent = %self.inner.id, channel = %channel_id, "Not subscribed, message dropped");
            return Ok(false);
        };

        channel.publish(&self.inner.id, &self.inner.name, Message::new(content.clone()))?;
        state.record(channel_id, self.inner.own_entry(content));
        Ok(true)
    }

    /// Create a private channel, join it, and announce it on
    /// `recipient_channel_id` with a message carrying the new channel's id.
    ///
    /// Nobody else is subscribed to the new channel as a side effect.
    pub async fn create_and_share_channel(
        &self,
        new_channel_id: &str,
        name: &str,
        description: &str,
        recipient_channel_id: &str,
        registry: &Registry,
    ) -> Result<ShareOutcome> {
        let channel = registry
            .create_channel(&ChannelConfig {
                id: new_channel_id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                public: false,
            })
            .await?;
        self.subscribe_to_channel(channel);

        let mut state = self.inner.state();
        let Some(recipient) = state.channels.get(recipient_channel_id).cloned() else {
            debug!(
                agent = %self.inner.id,
                channel = %recipient_channel_id,
                "Not subscribed to recipient channel, share skipped"
            );
            return Ok(ShareOutcome::RecipientNotSubscribed);
        };

        let content = format!("I created a new channel for focused discussion: {}", name);
        let message = Message::channel_share(content.clone(), new_channel_id);
        recipient.publish(&self.inner.id, &self.inner.name, message)?;
        state.record(recipient_channel_id, self.inner.own_entry(content));

        info!(
            agent = %self.inner.id,
            channel = %new_channel_id,
            shared_on = %recipient_channel_id,
            "Shared channel"
        );
        Ok(ShareOutcome::Shared)
    }

    /// Stop every delivery task and leave every channel. Idempotent.
    ///
    /// A reply whose completion is still in flight is discarded.
    pub fn shutdown(&self) {
        let mut state = self.inner.state();
        if state.subscriptions.is_empty() {
            return;
        }
        for (channel_id, subscription) in state.subscriptions.drain() {
            subscription.cancel();
            debug!(agent = %self.inner.id, channel = %channel_id, "Delivery task cancelled");
        }
        for channel in std::mem::take(&mut state.channels).into_values() {
            channel.unsubscribe(&self.inner.id);
        }
        info!(agent = %self.inner.id, "Agent shut down");
    }

    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.inner.state().subscriptions.contains_key(channel_id)
    }

    /// Number of subscriptions whose delivery task is still running.
    pub fn active_subscriptions(&self) -> usize {
        self.inner
            .state()
            .subscriptions
            .values()
            .filter(|subscription| subscription.is_active())
            .count()
    }

    /// Ids of channels with an active subscription, sorted.
    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.state().subscriptions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn last_seen_offset(&self, channel_id: &str) -> Option<u64> {
        self.inner
            .state()
            .subscriptions
            .get(channel_id)
            .and_then(Subscription::last_seen_offset)
    }

    /// Full history for a channel, oldest first.
    pub fn history(&self, channel_id: &str) -> Vec<HistoryEntry> {
        self.inner
            .state()
            .history
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The last `limit` history entries for a channel, oldest first.
    pub fn recent_history(&self, channel_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.inner.state().recent(channel_id, limit)
    }

    /// Channel ids this agent has received as shared references.
    pub fn known_channel_refs(&self) -> Vec<String> {
        self.inner.state().known_refs.clone()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("role", &self.inner.role)
            .finish()
    }
}

impl AgentInner {
    fn state(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn own_entry(&self, content: String) -> HistoryEntry {
        HistoryEntry {
            sender_id: self.id.clone(),
            sender_name: self.name.clone(),
            content,
        }
    }

    /// React to one message from another sender.
    async fn handle_delivery(&self, channel: &Channel, envelope: Envelope, cancel: &CancellationToken) {
        let message = &envelope.message;

        let prompt = {
            let mut state = self.state();
            state.record(
                channel.id(),
                HistoryEntry {
                    sender_id: envelope.sender_id.clone(),
                    sender_name: envelope.sender_name.clone(),
                    content: message.content().to_string(),
                },
            );

            if !message.channel_refs().is_empty() {
                let added = state.remember_refs(message.channel_refs());
                debug!(
                    agent = %self.id,
                    channel = %channel.id(),
                    refs = ?message.channel_refs(),
                    added,
                    "Received channel references"
                );
            }

            let should_respond = envelope.sender_id != self.id && !message.is_auto_response();
            if !should_respond {
                debug!(
                    agent = %self.id,
                    channel = %channel.id(),
                    offset = envelope.offset,
                    "Auto-response received, not replying"
                );
                return;
            }

            let history = state.recent(channel.id(), self.history_window);
            self.templates.render_agent_response(&PromptContext {
                system_prompt: &state.system_prompt,
                agent_name: &self.name,
                agent_role: &self.role,
                channel_name: channel.name(),
                sender: &envelope.sender_name,
                message: message.content(),
                history: &history,
            })
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(agent = %self.id, channel = %channel.id(), "Completion abandoned on shutdown");
                return;
            }
            result = self.completion.complete(&prompt) => result,
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    agent = %self.id,
                    channel = %channel.id(),
                    offset = envelope.offset,
                    "Completion via '{}' failed, no reply: {:#}",
                    self.completion.name(),
                    e
                );
                return;
            }
        };

        // Holding the state lock orders this check against shutdown/unsubscribe.
        let mut state = self.state();
        if cancel.is_cancelled() {
            debug!(agent = %self.id, channel = %channel.id(), "Late completion discarded");
            return;
        }
        let Some(handle) = state.channels.get(channel.id()).cloned() else {
            return;
        };
        match handle.publish(&self.id, &self.name, Message::auto_response(reply.clone())) {
            Ok(_) => state.record(channel.id(), self.own_entry(reply)),
            Err(e) => warn!(agent = %self.id, channel = %channel.id(), "Reply not published: {}", e),
        }
    }
}

async fn run_delivery(
    agent: Arc<AgentInner>,
    channel: Arc<Channel>,
    mut receiver: ChannelReceiver,
    cancel: CancellationToken,
    cursor: Arc<AtomicU64>,
) {
    debug!(agent = %agent.id, channel = %channel.id(), "Delivery task started");
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = receiver.recv() => match next {
                Some(envelope) => envelope,
                None => break,
            },
        };
        cursor.store(envelope.offset + 1, Ordering::Release);

        if envelope.sender_id == agent.id {
            continue;
        }
        agent.handle_delivery(&channel, envelope, &cancel).await;
    }
    debug!(agent = %agent.id, channel = %channel.id(), "Delivery task stopped");
}
