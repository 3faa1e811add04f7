//! Tool-augmented reasoning loop over a line-delimited JSON-RPC stdio protocol.
//!
//! `tether` connects a language-model-driven agent to a separate *tool host*
//! process. The host advertises a catalog of capabilities and executes them
//! on request; the agent asks a generation backend what to do next, parses
//! any embedded tool invocation out of the model's free text, runs it through
//! the host, and feeds the observation back until the model answers.
//!
//! # Getting started
//!
//! Serve tools from a host process:
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), TransportError> {
//!     let registry = ToolRegistry::new().with(MyTool);
//!     Host::new(registry).serve_stdio().await
//! }
//! ```
//!
//! Drive it from an agent:
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let mut client = Client::connect("tether-host", &[], ClientConfig::default()).await?;
//! let backend = OllamaBackend::new(OllamaConfig::from_env())?;
//! let result = Agent::new(&backend, &mut client, AgentConfig::default())
//!     .run("What's the weather in the capital of France?")
//!     .await?;
//! println!("{}", result.response);
//! client.close().await;
//! ```
//!
//! # Where to find things
//!
//! - **Wire format:** [`protocol`] defines [`Message`](protocol::Message),
//!   request ids, error codes and the typed params/results of the three
//!   methods (`initialize`, `tools/list`, `tools/call`).
//! - **Framing:** [`transport::Transport`] sends and receives one JSON frame
//!   per line with an optional read timeout.
//! - **Capabilities:** the [`Tool`](tools::Tool) trait, [`FnTool`](tools::FnTool)
//!   for closures and [`ToolRegistry`](tools::ToolRegistry) for lookup.
//! - **Server side:** [`host::Host`] dispatches frames to the registry.
//! - **Client side:** [`client::Client`] spawns a host subprocess and offers
//!   a typed `call`.
//! - **Reasoning loop:** [`agent::Agent`], its [`AgentConfig`](agent::AgentConfig),
//!   the [`InvocationParser`](agent::parser::InvocationParser) and the
//!   [`EventHandler`](agent::EventHandler) family.
//! - **Model backends:** [`backend::Backend`] with
//!   [`OllamaBackend`](backend::OllamaBackend) and
//!   [`ScriptedBackend`](backend::ScriptedBackend).
//!
//! # Errors
//!
//! Failures are split in two tiers. A tool that fails returns a
//! [`ToolOutcome`](tools::ToolOutcome) with `is_error = true`; the agent reads
//! it like any other observation. A broken session surfaces as
//! [`TransportError`] and ends the run with
//! [`AgentError::HostUnreachable`](agent::AgentError::HostUnreachable).

pub mod agent;
pub mod backend;
pub mod client;
pub mod error;
pub mod host;
pub mod prelude;
pub mod protocol;
pub mod tools;
pub mod transport;

use schemars::JsonSchema;

pub use error::{ClientError, TransportError};

// Re-export schemars for tool crates.
pub use schemars;

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Used to build the `inputSchema` advertised in the
/// capability catalog from a typed argument struct.
///
/// # Example
///
/// ```
/// use tether::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct WeatherArgs {
///     city: String,
/// }
///
/// let schema = json_schema_for::<WeatherArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"city".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}
