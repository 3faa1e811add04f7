//! Capability abstraction for the tool host.
//!
//! The [`Tool`] trait defines the interface every capability implements: a
//! catalog entry (name, description, JSON schema) and an async `execute`
//! method. Tools are collected into a [`ToolRegistry`] which handles lookup,
//! catalog export, validation, timeouts, and result truncation.

use crate::protocol::{Arguments, ToolDescriptor};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Maximum size (in bytes) for tool output before truncation.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 30_000;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolOutcome> + Send + 'a>>;

// ── ToolOutcome ────────────────────────────────────────────────────

/// Result of one tool execution.
///
/// A failed execution is still an outcome: `is_error` is set and `text`
/// explains what went wrong. The host forwards both kinds unchanged inside a
/// successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

impl From<Result<String, String>> for ToolOutcome {
    fn from(result: Result<String, String>) -> Self {
        match result {
            Ok(text) => Self::text(text),
            Err(text) => Self::error(text),
        }
    }
}

impl From<String> for ToolOutcome {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

// ── Tool trait ─────────────────────────────────────────────────────

/// A capability the host can execute on request.
///
/// # Example
///
/// ```ignore
/// struct Shout;
///
/// impl Tool for Shout {
///     fn descriptor(&self) -> ToolDescriptor {
///         ToolDescriptor::new("shout", "Upper-case the input", json_schema_for::<ShoutArgs>())
///     }
///
///     fn execute(&self, arguments: &Arguments) -> ToolFuture<'_> {
///         let text = arguments.get("text").cloned();
///         Box::pin(async move {
///             match text {
///                 Some(t) => ToolOutcome::text(t.to_uppercase()),
///                 None => ToolOutcome::error("Error: 'text' is required"),
///             }
///         })
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// The catalog entry advertised by `tools/list`.
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute with flat string arguments.
    ///
    /// Validating the arguments is the tool's own job. Report failures as
    /// [`ToolOutcome::error`] rather than panicking.
    fn execute(&self, arguments: &Arguments) -> ToolFuture<'_>;

    fn name(&self) -> String {
        self.descriptor().name
    }
}

// ── ToolRegistry ───────────────────────────────────────────────────

/// Default timeout for tool execution (60 seconds).
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Name → capability table, iterated in registration order.
///
/// Registering a name twice replaces the earlier tool in place: the
/// replacement answers lookups and keeps the original catalog position.
///
/// ```ignore
/// let registry = ToolRegistry::new()
///     .with_max_result_bytes(15_000)
///     .with_default_timeout(Some(Duration::from_secs(30)))
///     .with(Echo)
///     .with_if(!offline, Weather::new(client));
/// ```
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
    max_result_bytes: usize,
    /// Whether to validate arguments against the declared schema first.
    validate_args: bool,
    /// `None` disables timeouts.
    default_timeout: Option<Duration>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("max_result_bytes", &self.max_result_bytes)
            .field("validate_args", &self.validate_args)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            validate_args: false,
            default_timeout: None,
        }
    }

    /// Set the maximum result size in bytes before truncation.
    pub fn with_max_result_bytes(mut self, max: usize) -> Self {
        self.max_result_bytes = max;
        self
    }

    /// Enable JSON Schema argument validation before tool execution.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Set a timeout applied to every execution. `None` disables it.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register a tool. An existing tool with the same name is replaced.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_boxed(Box::new(tool));
    }

    pub fn register_boxed(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name();
        match self.index.get(&name) {
            Some(&slot) => {
                debug!("Replacing registered tool '{name}'");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Register a tool only when `condition` holds (builder pattern).
    pub fn with_if(self, condition: bool, tool: impl Tool + 'static) -> Self {
        if condition { self.with(tool) } else { self }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    /// All tools in registration order.
    pub fn all(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// The capability catalog, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.all().map(|t| t.descriptor()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.all().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name with optional validation, timing, and
    /// truncation. Returns `None` only when no tool has that name; every
    /// other failure is an error outcome.
    pub async fn execute(&self, name: &str, arguments: &Arguments) -> Option<ToolOutcome> {
        let tool = self.get(name)?;

        if self.validate_args
            && let Some(error) = validate_tool_arguments(&tool.descriptor(), arguments)
        {
            return Some(error);
        }

        log_tool_call(name, arguments);
        let start = Instant::now();

        let guarded = AssertUnwindSafe(tool.execute(arguments)).catch_unwind();
        let finished = match self.default_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(r) => r,
                Err(_) => {
                    info!(
                        "Tool {name} timed out after {:.1}s (limit: {:.0}s)",
                        start.elapsed().as_secs_f64(),
                        limit.as_secs_f64(),
                    );
                    return Some(ToolOutcome::error(format!(
                        "Error: tool '{name}' timed out after {:.0} seconds.",
                        limit.as_secs_f64(),
                    )));
                }
            },
            None => guarded.await,
        };

        let outcome = match finished {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Tool {name} panicked during execution");
                ToolOutcome::error(format!("Error: tool '{name}' failed unexpectedly."))
            }
        };

        debug!(
            "Tool {name} completed in {:.0}ms ({} bytes, is_error={})",
            start.elapsed().as_secs_f64() * 1000.0,
            outcome.text.len(),
            outcome.is_error,
        );
        trace!(
            "Tool {name} result preview: {}",
            outcome.text.chars().take(300).collect::<String>()
        );

        Some(ToolOutcome {
            text: truncate_result(outcome.text, self.max_result_bytes),
            is_error: outcome.is_error,
        })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── FnTool ────────────────────────────────────────────────────────

/// Type-erased async handler for [`FnTool`].
type ErasedToolHandler =
    Box<dyn Fn(Value) -> Pin<Box<dyn Future<Output = ToolOutcome> + Send>> + Send + Sync>;

/// A closure-based tool whose handler receives typed arguments.
///
/// The flat string arguments are lifted into JSON using the descriptor's
/// declared property types, then deserialized into `A`. Parse failures
/// become error outcomes without reaching the handler.
///
/// Use [`FnTool`] for stateless tools. For tools that hold state (HTTP
/// clients, configuration) implement [`Tool`] on a struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct AddArgs {
///     /// First addend.
///     a: i64,
///     /// Second addend.
///     b: i64,
/// }
///
/// let tool = FnTool::new(
///     ToolDescriptor::new("add", "Add two integers", json_schema_for::<AddArgs>()),
///     |args: AddArgs| async move { ToolOutcome::text((args.a + args.b).to_string()) },
/// );
/// ```
pub struct FnTool {
    descriptor: ToolDescriptor,
    handler: ErasedToolHandler,
}

impl FnTool {
    pub fn new<A, F, Fut, R>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        A: serde::de::DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<ToolOutcome>,
    {
        let erased = move |lifted: Value| -> Pin<Box<dyn Future<Output = ToolOutcome> + Send>> {
            match serde_json::from_value::<A>(lifted) {
                Ok(args) => {
                    let fut = handler(args);
                    Box::pin(async move { fut.await.into() })
                }
                Err(e) => Box::pin(async move {
                    ToolOutcome::error(format!("Error: invalid tool arguments: {e}"))
                }),
            }
        };

        Self {
            descriptor,
            handler: Box::new(erased),
        }
    }
}

impl Tool for FnTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    fn execute(&self, arguments: &Arguments) -> ToolFuture<'_> {
        (self.handler)(typed_arguments(&self.descriptor.input_schema, arguments))
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.descriptor.name)
            .finish()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Lift flat string arguments into a JSON object. A value is parsed as
/// JSON when the schema declares a type for it that excludes `string`;
/// anything else, or anything that fails to parse, stays a string.
pub fn typed_arguments(schema: &Value, arguments: &Arguments) -> Value {
    let object = arguments
        .iter()
        .map(|(key, raw)| {
            let value = if accepts_string(schema, key) {
                Value::String(raw.clone())
            } else {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            };
            (key.clone(), value)
        })
        .collect();
    Value::Object(object)
}

fn accepts_string(schema: &Value, key: &str) -> bool {
    let declared = schema
        .get("properties")
        .and_then(|p| p.get(key))
        .and_then(|p| p.get("type"));
    match declared {
        None => true,
        Some(Value::String(t)) => t == "string",
        Some(Value::Array(types)) => types.iter().any(|t| t == "string"),
        Some(_) => true,
    }
}

/// Validate arguments against the descriptor's declared JSON Schema.
///
/// Returns `None` if valid (or if the schema itself is unusable), or an
/// error outcome listing every violation.
pub fn validate_tool_arguments(
    descriptor: &ToolDescriptor,
    arguments: &Arguments,
) -> Option<ToolOutcome> {
    let validator = jsonschema::validator_for(&descriptor.input_schema).ok()?;
    let instance = typed_arguments(&descriptor.input_schema, arguments);

    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(ToolOutcome::error(format!(
            "Error: argument validation failed for tool '{}':\n{}",
            descriptor.name,
            errors.join("\n")
        )))
    }
}

/// Log a tool call at INFO level with a truncated preview of arguments.
pub fn log_tool_call(name: &str, arguments: &Arguments) {
    let rendered = serde_json::to_string(arguments).unwrap_or_default();
    let args_preview: String = rendered.chars().take(120).collect();
    info!(
        "[tool] {}({args_preview}{})",
        name,
        if rendered.chars().count() > 120 { "..." } else { "" }
    );
    trace!("[tool] {name} arguments: {rendered}");
}

/// Truncate a string to at most `max` bytes (on a char boundary),
/// appending a notice if trimmed.
pub fn truncate_result(s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}...\n[truncated: {} bytes total]",
        s.get(..cut).unwrap_or_default(),
        s.len()
    )
}

/// Parse flat string arguments into a typed struct, using `T`'s own
/// schema to decide which values are JSON and which are plain strings.
///
/// The error is formatted for returning directly from [`Tool::execute`].
///
/// ```ignore
/// fn execute(&self, arguments: &Arguments) -> ToolFuture<'_> {
///     let parsed = parse_args::<WeatherArgs>(arguments);
///     Box::pin(async move {
///         let args = match parsed {
///             Ok(a) => a,
///             Err(e) => return ToolOutcome::error(e),
///         };
///         // ... use args
///     })
/// }
/// ```
pub fn parse_args<T>(arguments: &Arguments) -> Result<T, String>
where
    T: serde::de::DeserializeOwned + schemars::JsonSchema,
{
    let schema = crate::json_schema_for::<T>();
    serde_json::from_value(typed_arguments(&schema, arguments))
        .map_err(|e| format!("Error: invalid tool arguments: {e}"))
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct EchoTool;

    impl Tool for EchoTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(
                "echo",
                "Echo the input",
                json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            )
        }

        fn execute(&self, arguments: &Arguments) -> ToolFuture<'_> {
            let result = match arguments.get("text") {
                Some(text) => ToolOutcome::text(text.clone()),
                None => ToolOutcome::error("Error: no text"),
            };
            Box::pin(async move { result })
        }
    }

    struct FailTool;

    impl Tool for FailTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("fail", "Always fails", json!({"type": "object", "properties": {}}))
        }

        fn execute(&self, _arguments: &Arguments) -> ToolFuture<'_> {
            Box::pin(async { ToolOutcome::error("Error: intentional failure") })
        }
    }

    struct Labelled(&'static str, &'static str);

    impl Tool for Labelled {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.0, self.1, json!({"type": "object", "properties": {}}))
        }

        fn execute(&self, _arguments: &Arguments) -> ToolFuture<'_> {
            let label = self.1.to_string();
            Box::pin(async move { ToolOutcome::text(label) })
        }
    }

    fn args(pairs: &[(&str, &str)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn tool_name_from_descriptor() {
        assert_eq!(EchoTool.name(), "echo");
    }

    #[test]
    fn registry_preserves_registration_order() {
        let registry = ToolRegistry::new()
            .with(FailTool)
            .with(EchoTool)
            .with(Labelled("zeta", "z"));
        assert_eq!(registry.names(), vec!["fail", "echo", "zeta"]);
        let descriptors = registry.descriptors();
        assert_eq!(descriptors[1].name, "echo");
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_registration_replaces_in_place() {
        let registry = ToolRegistry::new()
            .with(Labelled("a", "first"))
            .with(Labelled("b", "other"))
            .with(Labelled("a", "second"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.descriptors()[0].description, "second");
        let outcome = registry.execute("a", &Arguments::new()).await.unwrap();
        assert_eq!(outcome.text, "second");
    }

    #[test]
    fn with_if_skips_when_false() {
        let registry = ToolRegistry::new()
            .with_if(false, EchoTool)
            .with_if(true, FailTool);
        assert!(registry.get("echo").is_none());
        assert!(registry.get("fail").is_some());
    }

    #[tokio::test]
    async fn execute_known_tool() {
        let registry = ToolRegistry::new().with(EchoTool);
        let outcome = registry.execute("echo", &args(&[("text", "hello")])).await;
        assert_eq!(outcome, Some(ToolOutcome::text("hello")));
    }

    #[tokio::test]
    async fn execute_unknown_tool_is_none() {
        let registry = ToolRegistry::new().with(EchoTool);
        assert!(registry.execute("nonexistent", &Arguments::new()).await.is_none());
    }

    #[tokio::test]
    async fn failing_tool_is_an_error_outcome() {
        let registry = ToolRegistry::new().with(FailTool);
        let outcome = registry.execute("fail", &Arguments::new()).await.unwrap();
        assert!(outcome.is_error);
        assert!(outcome.text.contains("intentional failure"));
    }

    #[tokio::test]
    async fn truncates_long_results() {
        let registry = ToolRegistry::new().with(EchoTool).with_max_result_bytes(10);
        let long = "é".repeat(40);
        let outcome = registry.execute("echo", &args(&[("text", &long)])).await.unwrap();
        assert!(outcome.text.contains("[truncated: 80 bytes total]"));
        assert!(outcome.text.starts_with("ééééé..."));
    }

    #[tokio::test]
    async fn timeout_becomes_error_outcome() {
        struct Slow;
        impl Tool for Slow {
            fn descriptor(&self) -> ToolDescriptor {
                ToolDescriptor::new("slow", "Sleeps", json!({"type": "object"}))
            }
            fn execute(&self, _arguments: &Arguments) -> ToolFuture<'_> {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    ToolOutcome::text("late")
                })
            }
        }

        let registry = ToolRegistry::new()
            .with(Slow)
            .with_default_timeout(Some(Duration::from_millis(20)));
        let outcome = registry.execute("slow", &Arguments::new()).await.unwrap();
        assert!(outcome.is_error);
        assert!(outcome.text.contains("timed out"));
    }

    #[tokio::test]
    async fn panicking_tool_is_contained() {
        struct Boom;
        impl Tool for Boom {
            fn descriptor(&self) -> ToolDescriptor {
                ToolDescriptor::new("boom", "Panics", json!({"type": "object"}))
            }
            fn execute(&self, _arguments: &Arguments) -> ToolFuture<'_> {
                Box::pin(async {
                    if true {
                        panic!("kaboom");
                    }
                    ToolOutcome::text("unreachable")
                })
            }
        }

        let registry = ToolRegistry::new().with(Boom);
        let outcome = registry.execute("boom", &Arguments::new()).await.unwrap();
        assert!(outcome.is_error);
    }

    #[tokio::test]
    async fn validation_rejects_missing_required_argument() {
        let registry = ToolRegistry::new().with(EchoTool).with_arg_validation(true);
        let outcome = registry.execute("echo", &Arguments::new()).await.unwrap();
        assert!(outcome.is_error);
        assert!(outcome.text.contains("validation failed"));

        let ok = registry.execute("echo", &args(&[("text", "x")])).await.unwrap();
        assert!(!ok.is_error);
    }

    #[test]
    fn typed_arguments_follow_schema_types() {
        let d = ToolDescriptor::new(
            "t",
            "",
            json!({
                "type": "object",
                "properties": {
                    "label": {"type": "string"},
                    "count": {"type": "integer"}
                }
            }),
        );
        let lifted = typed_arguments(
            &d.input_schema,
            &args(&[("label", "42"), ("count", "42"), ("free", "x")]),
        );
        assert_eq!(lifted, json!({"label": "42", "count": 42, "free": "x"}));
    }

    #[derive(Deserialize, schemars::JsonSchema)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[tokio::test]
    async fn fn_tool_parses_typed_arguments() {
        let tool = FnTool::new(
            ToolDescriptor::new("add", "Add", crate::json_schema_for::<AddArgs>()),
            |args: AddArgs| async move { ToolOutcome::text((args.a + args.b).to_string()) },
        );
        let outcome = tool.execute(&args(&[("a", "2"), ("b", "40")])).await;
        assert_eq!(outcome, ToolOutcome::text("42"));

        let bad = tool.execute(&args(&[("a", "two")])).await;
        assert!(bad.is_error);
        assert!(bad.text.starts_with("Error: invalid tool arguments"));
    }

    #[test]
    fn parse_args_keeps_numeric_looking_strings() {
        #[derive(Deserialize, schemars::JsonSchema)]
        struct Mixed {
            name: String,
            days: u32,
        }
        let parsed: Mixed = parse_args(&args(&[("name", "7"), ("days", "3")])).unwrap();
        assert_eq!(parsed.name, "7");
        assert_eq!(parsed.days, 3);
    }

    #[test]
    fn truncate_result_passes_short_strings() {
        assert_eq!(truncate_result("short".into(), 100), "short");
    }
}
