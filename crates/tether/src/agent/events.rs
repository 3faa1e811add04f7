//! Events, handlers, and run results for the [`Agent`](super::harness::Agent).
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Several handlers in order |

use super::parser::Invocation;
use super::transcript::Observation;
use tracing::{debug, info, warn};

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted during [`Agent::run`](super::harness::Agent::run).
#[derive(Debug)]
pub enum AgentEvent<'a> {
    /// A new think step is starting.
    IterationStart { iteration: u32, max_iterations: u32 },
    /// The backend replied.
    ModelOutput(&'a str),
    /// The reply contained an invocation that is about to be sent.
    Invoking(&'a Invocation),
    /// The host answered an invocation.
    Observed {
        invocation: &'a Invocation,
        observation: &'a Observation,
    },
    /// The reply contained no invocation and is the final answer.
    Finished { iterations: u32 },
    /// The loop stopped at the cap without a final answer.
    IterationLimitReached { max_iterations: u32 },
}

/// Observer for agent events.
///
/// ```ignore
/// struct Printer;
///
/// impl EventHandler for Printer {
///     fn on_event(&self, event: &AgentEvent<'_>) {
///         if let AgentEvent::ModelOutput(text) = event {
///             println!("{text}");
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &AgentEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let AgentEvent::Observed { observation, .. } = event {
///         eprintln!("observation: {}", observation.text);
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&AgentEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&AgentEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&AgentEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &AgentEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches each event to several handlers in registration order.
#[derive(Default)]
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &AgentEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &AgentEvent<'_>) {
        match event {
            AgentEvent::IterationStart {
                iteration,
                max_iterations,
            } => {
                info!("[iteration {iteration}/{max_iterations}]");
            }
            AgentEvent::ModelOutput(text) => {
                let preview: String = text.chars().take(200).collect();
                debug!(
                    "LLM text: {preview}{}",
                    if text.chars().count() > 200 { "..." } else { "" }
                );
            }
            AgentEvent::Invoking(invocation) => {
                info!(
                    "Invoking {} with {}",
                    invocation.name,
                    serde_json::to_string(&invocation.arguments).unwrap_or_default()
                );
            }
            AgentEvent::Observed {
                invocation,
                observation,
            } => {
                if observation.is_error {
                    warn!("Tool {} reported an error: {}", invocation.name, observation.text);
                } else {
                    debug!(
                        "Tool {} result: {} bytes",
                        invocation.name,
                        observation.text.len()
                    );
                }
            }
            AgentEvent::Finished { iterations } => {
                info!("Agent finished after {iterations} iteration(s)");
            }
            AgentEvent::IterationLimitReached { max_iterations } => {
                info!("Agent hit iteration limit ({max_iterations})");
            }
        }
    }
}

// ── Run result ─────────────────────────────────────────────────────

/// Outcome of one [`Agent::run`](super::harness::Agent::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResult {
    /// The final answer, or an explanation of why there is none.
    pub response: String,
    /// Think steps taken. Never exceeds the configured maximum.
    pub iterations: u32,
    /// `true` only when the model produced a final answer.
    pub completed: bool,
}
