//! Named many-to-many broadcast channels.
//!
//! A channel fans every published message out to one unbounded queue per
//! attached consumer:
//! - Consumers attached before a publish receive it exactly once.
//! - Every consumer observes publishes in the same order.
//! - Late consumers see only what is published after they attach (no replay).
//!
//! Subscriber membership is bookkeeping for introspection and is kept apart
//! from stream attachment; agents do both when they subscribe.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AgoraError, Result};
use crate::message::Message;

/// One published message as seen by a consumer.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Position of this message in the channel's publish order, starting at 0.
    pub offset: u64,
    pub sender_id: String,
    pub sender_name: String,
    pub message: Arc<Message>,
}

/// Consumer end of a channel stream.
pub type ChannelReceiver = mpsc::UnboundedReceiver<Envelope>;

struct Stream {
    next_offset: u64,
    consumers: Vec<mpsc::UnboundedSender<Envelope>>,
    closed: bool,
}

pub struct Channel {
    id: String,
    name: String,
    description: String,
    is_public: bool,
    subscribers: RwLock<HashSet<String>>,
    stream: Mutex<Stream>,
}

/// Read-only projection of a channel for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub subscriber_count: usize,
}

impl Channel {
    pub(crate) fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        is_public: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            is_public,
            subscribers: RwLock::new(HashSet::new()),
            stream: Mutex::new(Stream {
                next_offset: 0,
                consumers: Vec::new(),
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    fn stream(&self) -> MutexGuard<'_, Stream> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast `message` to every attached consumer.
    ///
    /// Never waits on consumers. Returns how many consumers the message was
    /// handed to; fails only once the channel has been closed.
    pub fn publish(&self, sender_id: &str, sender_name: &str, message: Message) -> Result<usize> {
        let mut stream = self.stream();
        if stream.closed {
            return Err(AgoraError::ChannelClosed(self.id.clone()));
        }

        let envelope = Envelope {
            offset: stream.next_offset,
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            message: Arc::new(message),
        };
        stream.next_offset += 1;

        // Consumers whose receiver is gone are pruned here.
        stream
            .consumers
            .retain(|consumer| consumer.send(envelope.clone()).is_ok());

        debug!(
            channel = %self.id,
            sender = %sender_id,
            offset = envelope.offset,
            consumers = stream.consumers.len(),
            "Published message"
        );
        Ok(stream.consumers.len())
    }

    /// Attach a new consumer that receives every message published from now on.
    ///
    /// On a closed channel the returned stream is already finished.
    pub fn attach(&self) -> ChannelReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = self.stream();
        if !stream.closed {
            stream.consumers.push(tx);
        }
        rx
    }

    /// Number of consumers currently attached to the stream.
    pub fn consumer_count(&self) -> usize {
        self.stream()
            .consumers
            .iter()
            .filter(|consumer| !consumer.is_closed())
            .count()
    }

    /// Tear the channel down: further publishes fail and every consumer's
    /// stream ends after draining what it already holds.
    pub fn close(&self) {
        let mut stream = self.stream();
        stream.closed = true;
        stream.consumers.clear();
        debug!(channel = %self.id, "Channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.stream().closed
    }

    /// Add `agent_id` to the subscriber set. Idempotent.
    pub fn subscribe(&self, agent_id: &str) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(agent_id.to_string());
    }

    /// Remove `agent_id` from the subscriber set. Idempotent.
    pub fn unsubscribe(&self, agent_id: &str) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(agent_id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_subscribed(&self, agent_id: &str) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(agent_id)
    }

    /// Snapshot of the subscriber set.
    pub fn subscribers(&self) -> HashSet<String> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> ChannelSummary {
        ChannelSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            public: self.is_public,
            subscriber_count: self.subscriber_count(),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("public", &self.is_public)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
