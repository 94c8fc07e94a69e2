//! Reply prompt rendering.
//!
//! Templates use `{{placeholder}}` tokens replaced verbatim with their values.
//! Substitution is a single left-to-right pass over the template, so values
//! that themselves contain `{{...}}` are never expanded again. Unknown
//! placeholders and stray braces are left as written.

use agora_config::PromptTemplateConfig;

use crate::agent::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    agent_response: String,
    channel_welcome: String,
}

/// Values available to the agent-response template.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub system_prompt: &'a str,
    pub agent_name: &'a str,
    pub agent_role: &'a str,
    pub channel_name: &'a str,
    pub sender: &'a str,
    pub message: &'a str,
    /// Most recent history entries, oldest first.
    pub history: &'a [HistoryEntry],
}

impl PromptTemplates {
    pub fn new(agent_response: impl Into<String>, channel_welcome: impl Into<String>) -> Self {
        Self {
            agent_response: agent_response.into(),
            channel_welcome: channel_welcome.into(),
        }
    }

    pub fn agent_response(&self) -> &str {
        &self.agent_response
    }

    pub fn channel_welcome(&self) -> &str {
        &self.channel_welcome
    }

    pub fn render_agent_response(&self, ctx: &PromptContext<'_>) -> String {
        let history = format_history(ctx.history);
        render(&self.agent_response, |key| match key {
            "systemPrompt" => Some(ctx.system_prompt),
            "agentName" => Some(ctx.agent_name),
            "agentRole" => Some(ctx.agent_role),
            "channelName" => Some(ctx.channel_name),
            "sender" => Some(ctx.sender),
            "message" => Some(ctx.message),
            "history" => Some(history.as_str()),
            _ => None,
        })
    }
}

impl From<PromptTemplateConfig> for PromptTemplates {
    fn from(config: PromptTemplateConfig) -> Self {
        Self::new(config.agent_response, config.channel_welcome)
    }
}

fn format_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}: {}", entry.sender_name, entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render<'v>(template: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let value = after_open
            .find("}}")
            .and_then(|end| lookup(&after_open[..end]).map(|value| (value, end)));

        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after_open[end + 2..];
            }
            None => {
                // Not a placeholder here; a later "{{" may still start one.
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
