//! Error types for the messaging fabric.

use thiserror::Error;

/// Errors surfaced by the registry, channels and agents.
///
/// Completion failures never appear here: a failed completion only drops the
/// reply it would have produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgoraError {
    /// Prompt templates must be installed before the first agent is created.
    #[error("Prompt templates have not been installed")]
    TemplatesNotInstalled,

    #[error("Agent already exists: {0}")]
    AgentExists(String),

    /// Channel ids are unique for the lifetime of the process.
    #[error("Channel already exists: {0}")]
    ChannelExists(String),

    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Channel not found: {0}")]
    UnknownChannel(String),

    /// The channel has been torn down and accepts no more messages.
    #[error("Channel is closed: {0}")]
    ChannelClosed(String),
}

pub type Result<T> = std::result::Result<T, AgoraError>;
