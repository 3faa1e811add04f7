//! The think → act → observe loop.

use super::config::AgentConfig;
use super::events::{AgentEvent, AgentResult, EventHandler, NoopHandler};
use super::parser::InvocationParser;
use super::prompt::system_prompt;
use super::transcript::{Observation, Transcript};
use crate::backend::{Backend, BackendError};
use crate::client::Client;
use crate::error::ClientError;
use tracing::debug;

/// Why a run ended without an [`AgentResult`] of its own.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The session with the tool host broke. `partial` describes how far
    /// the run got.
    #[error("tool host is unreachable: {source}")]
    HostUnreachable {
        partial: AgentResult,
        #[source]
        source: ClientError,
    },

    #[error("generation backend failed: {0}")]
    Backend(#[from] BackendError),
}

/// Drives one task through a backend and a tool host session.
///
/// ```ignore
/// let mut agent = Agent::new(&backend, &mut client, AgentConfig::default())
///     .with_handler(&LoggingHandler);
/// let result = agent.run("What's the weather in Tokyo?").await?;
/// ```
pub struct Agent<'a> {
    backend: &'a dyn Backend,
    client: &'a mut Client,
    config: AgentConfig,
    parser: InvocationParser,
    handler: &'a dyn EventHandler,
}

impl<'a> Agent<'a> {
    pub fn new(backend: &'a dyn Backend, client: &'a mut Client, config: AgentConfig) -> Self {
        Self {
            backend,
            client,
            parser: InvocationParser::new(config.strategy),
            config,
            handler: &NoopHandler,
        }
    }

    pub fn with_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run `task` until the model answers without invoking a tool or the
    /// iteration cap is reached.
    ///
    /// Tool failures and rejected invocations are fed back to the model as
    /// observations. Only a broken host session or a backend failure ends the
    /// run with `Err`.
    pub async fn run(&mut self, task: &str) -> Result<AgentResult, AgentError> {
        let max_iterations = self.config.max_iterations;
        let system_prompt = system_prompt(
            self.client.descriptors(),
            self.config.strategy,
            self.config.instructions.as_deref(),
        );
        debug!("System prompt ({} chars)", system_prompt.len());

        let mut transcript = Transcript::new(task);

        for iteration in 1..=max_iterations {
            self.handler.on_event(&AgentEvent::IterationStart {
                iteration,
                max_iterations,
            });

            let output = self
                .backend
                .generate(&transcript.prompt(), &system_prompt)
                .await?;
            self.handler.on_event(&AgentEvent::ModelOutput(&output));

            let Some(invocation) = self.parser.parse(&output) else {
                self.handler.on_event(&AgentEvent::Finished {
                    iterations: iteration,
                });
                return Ok(AgentResult {
                    response: output.trim().to_string(),
                    iterations: iteration,
                    completed: true,
                });
            };

            self.handler.on_event(&AgentEvent::Invoking(&invocation));
            let observation = match self
                .client
                .call(&invocation.name, &invocation.arguments)
                .await
            {
                Ok(outcome) => Observation::from(outcome),
                Err(ClientError::Invocation { error, .. }) => Observation::rejected(&error),
                Err(source) => {
                    let partial = AgentResult {
                        response: format!(
                            "The tool host became unreachable during iteration {iteration} \
                             while running '{}': {source}",
                            invocation.name
                        ),
                        iterations: iteration,
                        completed: false,
                    };
                    return Err(AgentError::HostUnreachable { partial, source });
                }
            };

            self.handler.on_event(&AgentEvent::Observed {
                invocation: &invocation,
                observation: &observation,
            });
            transcript.record(invocation, observation);
        }

        self.handler
            .on_event(&AgentEvent::IterationLimitReached { max_iterations });
        Ok(AgentResult {
            response: format!(
                "I've reached the maximum number of iterations ({max_iterations}) without \
                 completing the task. The task may be too complex or require more steps."
            ),
            iterations: max_iterations,
            completed: false,
        })
    }
}
