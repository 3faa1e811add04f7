//! Configuration for the [`Agent`](super::harness::Agent).
//!
//! ```ignore
//! let config = AgentConfig::new()
//!     .with_max_iterations(5)
//!     .with_strategy(ParseStrategy::XmlTags)
//!     .with_instructions("Answer in one sentence.");
//! ```

use super::parser::ParseStrategy;

/// Default cap on think steps per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on think steps.
    pub max_iterations: u32,
    /// Invocation encoding taught to the model and parsed from its replies.
    pub strategy: ParseStrategy,
    /// Extra system prompt text appended under an "Instructions" heading.
    pub instructions: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            strategy: ParseStrategy::default(),
            instructions: None,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_strategy(mut self, strategy: ParseStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}
