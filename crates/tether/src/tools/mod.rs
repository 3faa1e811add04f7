//! Capabilities the host can execute.
//!
//! Every capability is a [`Tool`] implementor. Tools are collected into a
//! [`ToolRegistry`] which handles lookup, catalog export, validation,
//! truncation, and timeouts.
//!
//! # Defining tools
//!
//! - **[`FnTool`]**: closure-based, arguments deserialized into a typed
//!   struct. Best for stateless tools.
//! - **`impl Tool`**: full struct with [`Tool::descriptor()`] and
//!   [`Tool::execute()`]. Best for tools that own clients or configuration.

pub mod core;

pub use core::{
    DEFAULT_MAX_RESULT_BYTES, DEFAULT_TOOL_TIMEOUT, FnTool, Tool, ToolFuture, ToolOutcome,
    ToolRegistry, log_tool_call, parse_args, truncate_result, typed_arguments,
    validate_tool_arguments,
};
