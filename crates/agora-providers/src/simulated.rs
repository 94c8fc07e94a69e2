//! Keyword-driven completion backend for development and demos.

use anyhow::Result;
use async_trait::async_trait;

use crate::CompletionPort;

const MATH_REPLY: &str = "The mathematical perspective on this is quite interesting. We can approach this using calculus and differential equations to model the behavior.";
const PHYSICS_REPLY: &str = "From a physics standpoint, we need to consider both classical and quantum effects. The wave-particle duality is particularly relevant here.";
const ALGORITHM_REPLY: &str = "Computationally, we can solve this using a divide-and-conquer algorithm with O(n log n) complexity, which optimizes for both time and space.";
const DEFAULT_REPLY: &str = "That's an interesting point. I'd like to explore this further by considering multiple perspectives and analytical approaches.";

/// Deterministic backend: picks a canned reply by scanning the prompt for topics.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider;

impl SimulatedProvider {
    pub fn new() -> Self {
        Self
    }

    fn reply_for(prompt: &str) -> &'static str {
        if prompt.contains("mathematics") || prompt.contains("math") {
            MATH_REPLY
        } else if prompt.contains("physics") || prompt.contains("quantum") {
            PHYSICS_REPLY
        } else if prompt.contains("algorithm") || prompt.contains("computer science") {
            ALGORITHM_REPLY
        } else {
            DEFAULT_REPLY
        }
    }
}

#[async_trait]
impl CompletionPort for SimulatedProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(Self::reply_for(prompt).to_string())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
