//! Convenience re-exports for common `tether` types.
//!
//! ```ignore
//! use tether::prelude::*;
//! ```
//!
//! Pulls in what host binaries and agent programs need: the protocol
//! descriptor types, the [`Tool`] trait and [`ToolRegistry`], [`Host`],
//! [`Client`] with its config, the [`Agent`] loop and its event handlers,
//! and the generation backends.

// ── Protocol ────────────────────────────────────────────────────────
pub use crate::json_schema_for;
pub use crate::protocol::{Arguments, Implementation, ToolDescriptor};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{FnTool, Tool, ToolFuture, ToolOutcome, ToolRegistry, parse_args};

// ── Sessions ────────────────────────────────────────────────────────
pub use crate::client::{Client, ClientConfig};
pub use crate::error::{ClientError, TransportError};
pub use crate::host::Host;
pub use crate::transport::Transport;

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{
    Agent, AgentConfig, AgentError, AgentEvent, AgentResult, EventHandler, FnEventHandler,
    LoggingHandler, NoopHandler, ParseStrategy,
};
pub use crate::backend::{Backend, OllamaBackend, OllamaConfig, ScriptedBackend};
