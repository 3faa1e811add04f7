//! The capability client: one session with one tool host.
//!
//! [`Client::connect`] spawns the host executable, performs the
//! `initialize` handshake and fetches the catalog. Requests are strictly
//! sequential: each call sends one frame and waits for the matching reply
//! before returning.
//!
//! A transport failure (peer gone, timeout, garbage on the wire) breaks the
//! session for good; every later request fails fast with
//! [`TransportError::Closed`]. A protocol-level error reply only fails the
//! request that caused it.

use crate::error::{ClientError, TransportError};
use crate::protocol::{
    Arguments, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, Message, PROTOCOL_VERSION, RequestId, ToolDescriptor, describe_catalog,
    methods,
};
use crate::tools::ToolOutcome;
use crate::transport::Transport;
use serde_json::{Value, json};
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Default time to wait for any single reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time the host gets to exit on its own after its stdin closes.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Session settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on waiting for a reply. `None` waits forever.
    pub request_timeout: Option<Duration>,
    pub shutdown_grace: Duration,
    /// Reported to the host as `clientInfo`.
    pub client_info: Implementation,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            client_info: Implementation::new("tether", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_client_info(mut self, info: Implementation) -> Self {
        self.client_info = info;
        self
    }
}

/// A session with one tool host.
#[derive(Debug)]
pub struct Client {
    /// `None` once the session is closed or broken.
    transport: Option<Transport>,
    child: Option<Child>,
    config: ClientConfig,
    next_id: u64,
    descriptors: Vec<ToolDescriptor>,
    server_info: Option<Implementation>,
}

impl Client {
    /// Spawn `command` as a tool host with piped stdin/stdout. The host's
    /// stderr is inherited so its logs reach the terminal. No handshake is
    /// performed; see [`connect`](Self::connect).
    pub fn start(command: &str, args: &[String], config: ClientConfig) -> Result<Self, ClientError> {
        let spawn_error = |source: io::Error| ClientError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error(io::Error::other("host stdin was not captured")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(io::Error::other("host stdout was not captured")))?;

        info!(
            "Started tool host `{command}` (pid {})",
            child.id().map_or_else(|| "?".to_string(), |p| p.to_string())
        );

        let transport = Transport::new(stdout, stdin).with_read_timeout(config.request_timeout);
        Ok(Self {
            transport: Some(transport),
            child: Some(child),
            config,
            next_id: 1,
            descriptors: Vec::new(),
            server_info: None,
        })
    }

    /// A session over an already-connected transport, with no subprocess.
    pub fn over(transport: Transport, config: ClientConfig) -> Self {
        Self {
            transport: Some(transport.with_read_timeout(config.request_timeout)),
            child: None,
            config,
            next_id: 1,
            descriptors: Vec::new(),
            server_info: None,
        }
    }

    /// Start, handshake and discover the catalog. If any step fails the
    /// subprocess is shut down before the error is returned.
    pub async fn connect(
        command: &str,
        args: &[String],
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let mut client = Self::start(command, args, config)?;
        let ready = async {
            client.initialize().await?;
            client.discover_capabilities().await?;
            Ok::<_, ClientError>(())
        }
        .await;

        match ready {
            Ok(()) => Ok(client),
            Err(e) => {
                client.close().await;
                Err(e)
            }
        }
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&mut self) -> Result<InitializeResult, ClientError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_info: self.config.client_info.clone(),
            capabilities: json!({}),
        };
        let params = serde_json::to_value(params)
            .map_err(|e| ClientError::Handshake(format!("cannot encode params: {e}")))?;

        let raw = match self.request(methods::INITIALIZE, params).await {
            Ok(raw) => raw,
            Err(ClientError::Invocation { error, .. }) => {
                return Err(ClientError::Handshake(error.to_string()));
            }
            Err(ClientError::Transport(TransportError::Timeout(limit))) => {
                return Err(ClientError::Handshake(format!(
                    "no reply to initialize within {limit:?}"
                )));
            }
            Err(e) => return Err(e),
        };

        let result: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| ClientError::Handshake(format!("unexpected initialize result: {e}")))?;
        if result.protocol_version != PROTOCOL_VERSION {
            warn!(
                "Host speaks protocol {} (expected {PROTOCOL_VERSION})",
                result.protocol_version
            );
        }
        info!(
            "Connected to {} {}",
            result.server_info.name, result.server_info.version
        );
        self.server_info = Some(result.server_info.clone());
        Ok(result)
    }

    /// Fetch the catalog with `tools/list`, replacing any earlier one.
    pub async fn discover_capabilities(&mut self) -> Result<&[ToolDescriptor], ClientError> {
        let raw = self.request(methods::TOOLS_LIST, json!({})).await?;
        let listed: ListToolsResult = serde_json::from_value(raw).map_err(|e| {
            TransportError::Protocol(format!("malformed tools/list result: {e}"))
        })?;

        info!(
            "Discovered {} tools: {}",
            listed.tools.len(),
            listed
                .tools
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.descriptors = listed.tools;
        Ok(&self.descriptors)
    }

    /// Invoke one capability.
    ///
    /// A tool that fails still yields `Ok` with `is_error` set. `Err` means
    /// the host rejected the request ([`ClientError::Invocation`]) or the
    /// session broke ([`ClientError::Transport`]).
    pub async fn call(&mut self, name: &str, arguments: &Arguments) -> Result<ToolOutcome, ClientError> {
        let raw = self
            .request(methods::TOOLS_CALL, json!({"name": name, "arguments": arguments}))
            .await?;
        let result: CallToolResult = serde_json::from_value(raw).map_err(|e| {
            TransportError::Protocol(format!("malformed tools/call result: {e}"))
        })?;
        Ok(result.into_outcome())
    }

    /// The catalog from the last successful discovery.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// The catalog rendered for a system prompt.
    pub fn catalog_description(&self) -> String {
        describe_catalog(&self.descriptors)
    }

    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    /// OS process id of the host, while it is running.
    pub fn process_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// End the session: close both pipes, give the host the configured
    /// grace period to exit, then kill it. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!("Session closed");
        }
        let Some(mut child) = self.child.take() else {
            return;
        };

        let grace = self.config.shutdown_grace;
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => info!("Tool host exited ({status})"),
            Ok(Err(e)) => warn!("Failed to wait for tool host: {e}"),
            Err(_) => {
                warn!("Tool host still running after {grace:?}; killing it");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill tool host: {e}");
                }
            }
        }
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, ClientError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(TransportError::Closed.into());
        };
        let id = self.next_id;
        self.next_id += 1;

        let start = Instant::now();
        let reply = match exchange(transport, id, method, params).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Session with tool host broken during {method}: {e}");
                self.transport = None;
                return Err(e.into());
            }
        };
        debug!(
            "{method} #{id} answered in {:.0}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );

        reply.into_result().map_err(|error| ClientError::Invocation {
            method: method.to_string(),
            error,
        })
    }
}

/// Send one request and wait for the reply with the same id. Frames the
/// host sends on its own initiative are skipped; they do not extend the
/// read timeout, which bounds the whole wait.
async fn exchange(
    transport: &mut Transport,
    id: u64,
    method: &str,
    params: Value,
) -> Result<Message, TransportError> {
    transport
        .send(&Message::request(id, method, params))
        .await?;

    let expected = RequestId::from(id);
    let deadline = transport
        .read_timeout()
        .map(|limit| tokio::time::Instant::now() + limit);
    loop {
        let frame = transport.receive_until(deadline).await?;
        if let Some(other) = &frame.method {
            debug!("Ignoring host-initiated {other}");
            continue;
        }
        if frame.id.as_ref() != Some(&expected) {
            return Err(TransportError::Protocol(format!(
                "expected reply to request {expected}, got id {}",
                frame
                    .id
                    .as_ref()
                    .map_or_else(|| "<none>".to_string(), ToString::to_string)
            )));
        }
        return Ok(frame);
    }
}
