//! Host configuration: which built-in tools to serve and how to run them.

use crate::tools;
use std::time::Duration;
use tether::tools::{DEFAULT_MAX_RESULT_BYTES, DEFAULT_TOOL_TIMEOUT, ToolRegistry};
use tracing::warn;

/// Default timeout for the HTTP-backed tools.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for the built-in tool registry.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Tool names that are not registered.
    pub disabled: Vec<String>,
    /// Per-call timeout applied by the registry. `None` disables it.
    pub tool_timeout: Option<Duration>,
    /// Results longer than this are truncated.
    pub max_result_bytes: usize,
    /// Skip tools that need network access.
    pub offline: bool,
    /// Check arguments against each tool's schema before it runs.
    pub validate_args: bool,
    /// Timeout for outbound HTTP requests made by network tools.
    pub http_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            tool_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            offline: false,
            validate_args: true,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl HostConfig {
    pub fn with_disabled(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.disabled.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_max_result_bytes(mut self, max: usize) -> Self {
        self.max_result_bytes = max;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_validate_args(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    fn enabled(&self, name: &str) -> bool {
        !self.disabled.iter().any(|d| d == name)
    }

    /// Build the registry of built-in tools this configuration allows.
    ///
    /// Network tools are skipped when `offline` is set or when the HTTP
    /// client cannot be built.
    pub fn build_registry(&self) -> ToolRegistry {
        for name in &self.disabled {
            if !tools::ALL.contains(&name.as_str()) {
                warn!("--disable {name}: no built-in tool has that name");
            }
        }

        let registry = ToolRegistry::new()
            .with_max_result_bytes(self.max_result_bytes)
            .with_default_timeout(self.tool_timeout)
            .with_arg_validation(self.validate_args)
            .with_if(self.enabled(tools::ECHO), tools::echo())
            .with_if(self.enabled(tools::CURRENT_DAY), tools::CurrentDay);

        if self.offline {
            return registry;
        }

        let http = match tools::http_client(self.http_timeout) {
            Ok(c) => c,
            Err(e) => {
                warn!("Network tools disabled: failed to build HTTP client: {e}");
                return registry;
            }
        };

        registry
            .with_if(
                self.enabled(tools::WEATHER),
                tools::Weather::new(http.clone()),
            )
            .with_if(
                self.enabled(tools::COUNTRY_INFO),
                tools::CountryInfo::new(http),
            )
    }
}
