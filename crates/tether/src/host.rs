//! The capability host: serves a [`ToolRegistry`] over a [`Transport`].
//!
//! The host reads frames one at a time and answers each request before
//! reading the next. It stops when its input reaches end of stream.

use crate::error::TransportError;
use crate::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, Message, PROTOCOL_VERSION, RequestId, RpcError, ServerCapabilities, methods,
};
use crate::tools::ToolRegistry;
use crate::transport::Transport;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Lifecycle of a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Unstarted,
    Running,
    Stopped,
}

/// Dispatches protocol requests to a registry of tools.
#[derive(Debug)]
pub struct Host {
    registry: ToolRegistry,
    server_info: Implementation,
    state: HostState,
}

impl Host {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: Implementation::new("tether", env!("CARGO_PKG_VERSION")),
            state: HostState::Unstarted,
        }
    }

    /// Override the `serverInfo` reported by `initialize`.
    pub fn with_server_info(mut self, info: Implementation) -> Self {
        self.server_info = info;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Serve over this process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&mut self) -> Result<(), TransportError> {
        self.serve(Transport::stdio()).await
    }

    /// Serve until the peer closes its side of `transport`.
    ///
    /// Returns `Ok(())` on a clean end of stream. Malformed frames are
    /// answered with a parse error and do not end the session.
    pub async fn serve(&mut self, mut transport: Transport) -> Result<(), TransportError> {
        self.state = HostState::Running;
        info!(
            "Tool host {} serving {} tools",
            self.server_info.name,
            self.registry.len()
        );

        let result = loop {
            let reply = match transport.receive().await {
                Ok(message) => self.handle(message).await,
                Err(TransportError::Closed) => break Ok(()),
                Err(TransportError::Parse { message, id }) => {
                    warn!("Malformed frame: {message}");
                    Some(Message::error_reply(
                        id.unwrap_or(RequestId::Null),
                        RpcError::parse_error(message),
                    ))
                }
                Err(e) => break Err(e),
            };

            if let Some(reply) = reply {
                match transport.send(&reply).await {
                    Ok(()) => {}
                    Err(TransportError::Closed) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
        };

        self.state = HostState::Stopped;
        match &result {
            Ok(()) => info!("Input closed; tool host stopped"),
            Err(e) => warn!("Tool host stopped: {e}"),
        }
        result
    }

    /// Produce the reply for one frame, or `None` when nothing should be
    /// sent back (notifications and stray replies).
    pub async fn handle(&self, message: Message) -> Option<Message> {
        let is_reply = message.is_reply();
        let Message {
            id, method, params, ..
        } = message;

        let Some(method) = method else {
            if is_reply {
                warn!("Ignoring unsolicited reply (id {:?})", id);
                return None;
            }
            return match id {
                Some(id) => Some(Message::error_reply(
                    id,
                    RpcError::invalid_request("missing method"),
                )),
                None => {
                    warn!("Ignoring frame with neither id nor method");
                    None
                }
            };
        };

        debug!("Handling {method} (id {:?})", id);
        let outcome = match method.as_str() {
            methods::INITIALIZE => self.initialize(params),
            methods::TOOLS_LIST => self.list_tools(),
            methods::TOOLS_CALL => self.call_tool(params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        let Some(id) = id else {
            if let Err(e) = outcome {
                debug!("Notification {method} not handled: {e}");
            }
            return None;
        };
        Some(match outcome {
            Ok(result) => Message::reply(id, result),
            Err(error) => Message::error_reply(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, RpcError> {
        match params.map(serde_json::from_value::<InitializeParams>) {
            Some(Ok(p)) => info!(
                "Client {} {} connected (protocol {})",
                p.client_info.name, p.client_info.version, p.protocol_version
            ),
            Some(Err(e)) => debug!("Unrecognized initialize params: {e}"),
            None => debug!("initialize without params"),
        }
        to_result(&InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: self.server_info.clone(),
            capabilities: ServerCapabilities::default(),
        })
    }

    fn list_tools(&self) -> Result<Value, RpcError> {
        to_result(&ListToolsResult {
            tools: self.registry.descriptors(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
        let CallToolParams { name, arguments } =
            serde_json::from_value(params).map_err(RpcError::invalid_params)?;

        let outcome = self
            .registry
            .execute(&name, &arguments)
            .await
            .ok_or_else(|| RpcError::unknown_tool(&name))?;
        to_result(&CallToolResult::from(outcome))
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::internal)
}
