//! Immutable message values carried over channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Metadata key marking a reply synthesized by an agent.
pub const AUTO_RESPONSE_KEY: &str = "auto_response";

/// Metadata key naming the action a message performs.
pub const ACTION_KEY: &str = "action";

/// `action` value for a message that hands out a channel reference.
pub const CHANNEL_SHARE_ACTION: &str = "channel_share";

/// A message published on a channel.
///
/// Fields are private; a message is assembled with the builder methods and
/// never changes after it has been handed to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    content: String,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    /// Ids of channels being shared with whoever reads this message.
    #[serde(default)]
    channel_refs: Vec<String>,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            metadata: HashMap::new(),
            channel_refs: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A reply produced by an agent's reaction loop.
    pub fn auto_response(content: impl Into<String>) -> Self {
        Self::new(content).with_metadata(AUTO_RESPONSE_KEY, Value::Bool(true))
    }

    /// An announcement carrying a reference to `channel_id`.
    pub fn channel_share(content: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self::new(content)
            .with_metadata(ACTION_KEY, Value::String(CHANNEL_SHARE_ACTION.to_string()))
            .with_channel_refs(vec![channel_id.into()])
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_channel_refs(mut self, refs: Vec<String>) -> Self {
        self.channel_refs = refs;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn channel_refs(&self) -> &[String] {
        &self.channel_refs
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when the auto-response marker is present, whatever its value.
    pub fn is_auto_response(&self) -> bool {
        self.metadata.contains_key(AUTO_RESPONSE_KEY)
    }

    pub fn is_channel_share(&self) -> bool {
        self.metadata
            .get(ACTION_KEY)
            .and_then(Value::as_str)
            .is_some_and(|action| action == CHANNEL_SHARE_ACTION)
    }
}
