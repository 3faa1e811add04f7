//! Agent runtime: the reasoning loop and its supporting pieces.
//!
//! - [`harness::Agent`]: the think → act → observe loop. Start here.
//! - [`config::AgentConfig`]: iteration cap, parse strategy, extra
//!   instructions.
//! - [`parser`]: [`InvocationParser`] for the XML-tag and fenced-JSON
//!   invocation encodings.
//! - [`prompt`]: [`SystemPromptBuilder`] and the catalog description.
//! - [`transcript`]: the per-run record of steps and observations.
//! - [`events`]: [`EventHandler`] and [`AgentEvent`] for observing a run.

pub mod config;
pub mod events;
pub mod harness;
pub mod parser;
pub mod prompt;
pub mod transcript;

pub use config::{AgentConfig, DEFAULT_MAX_ITERATIONS};
pub use events::{
    AgentEvent, AgentResult, CompositeEventHandler, EventHandler, FnEventHandler,
    LoggingHandler, NoopHandler,
};
pub use harness::{Agent, AgentError};
pub use parser::{Invocation, InvocationParser, ParseStrategy};
pub use prompt::SystemPromptBuilder;
pub use transcript::{Observation, Transcript};
