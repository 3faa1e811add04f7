//! Wire types for the tool-hosting protocol.
//!
//! Every frame is a [`Message`]: a single JSON object on its own line.
//! Requests carry a `method`; replies carry either `result` or `error` and
//! echo the request `id` verbatim. A request without an `id` is a
//! notification and never gets a reply.
//!
//! ```text
//! {"version":"1.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}
//! {"version":"1.0","id":1,"result":{"content":[{"type":"text","text":"hi"}],"isError":false}}
//! ```

use crate::tools::ToolOutcome;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Version string written into every outgoing frame.
pub const WIRE_VERSION: &str = "1.0";

/// Protocol revision negotiated during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names understood by the host.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// Numeric error codes carried in [`RpcError::code`].
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

// ── Request ids ────────────────────────────────────────────────────

/// Correlation id of a request.
///
/// `Null` is a real id: a request sent with `"id": null` is still answered,
/// and the reply carries `"id": null`. An absent id is modelled one level up
/// as `Option::None` on [`Message::id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
    Null,
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s:?}"),
            RequestId::Null => f.write_str("null"),
        }
    }
}

// ── Frames ─────────────────────────────────────────────────────────

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(alias = "jsonrpc", default = "wire_version")]
    pub version: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_id"
    )]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

fn wire_version() -> String {
    WIRE_VERSION.to_string()
}

/// A present `"id": null` must stay distinguishable from a missing id.
fn present_id<'de, D>(deserializer: D) -> Result<Option<RequestId>, D::Error>
where
    D: Deserializer<'de>,
{
    RequestId::deserialize(deserializer).map(Some)
}

impl Message {
    fn blank() -> Self {
        Self {
            version: wire_version(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    pub fn request(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: Some(id.into()),
            method: Some(method.into()),
            params: Some(params),
            ..Self::blank()
        }
    }

    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: Some(method.into()),
            params: Some(params),
            ..Self::blank()
        }
    }

    pub fn reply(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::blank()
        }
    }

    pub fn error_reply(id: RequestId, error: RpcError) -> Self {
        Self {
            id: Some(id),
            error: Some(error),
            ..Self::blank()
        }
    }

    /// A frame answering some earlier request.
    pub fn is_reply(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }

    /// A request that expects no answer.
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// Split a reply into its result or its error. A reply with neither
    /// yields `Value::Null`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Structured error carried in an error reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {detail}"))
    }

    pub fn invalid_request(detail: impl fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {detail}"))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params: {detail}"))
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Unknown tool: {name}"))
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("Internal error: {detail}"))
    }
}

// ── initialize ─────────────────────────────────────────────────────

/// Name and version of one side of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub client_info: Implementation,
    #[serde(default)]
    pub capabilities: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub server_info: Implementation,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// Always `false`: the catalog never changes during a session.
    pub list_changed: bool,
}

// ── tools/list ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

/// One entry of the capability catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A single declared parameter, flattened out of an `inputSchema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSummary {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Parameters declared under `inputSchema.properties`, in schema order.
    pub fn parameters(&self) -> Vec<ParameterSummary> {
        let Some(properties) = self.input_schema.get("properties").and_then(Value::as_object)
        else {
            return Vec::new();
        };
        let required: Vec<&str> = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        properties
            .iter()
            .map(|(name, prop)| ParameterSummary {
                name: name.clone(),
                description: prop
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                required: required.contains(&name.as_str()),
            })
            .collect()
    }
}

/// Human-readable catalog listing, one block per tool.
pub fn describe_catalog(descriptors: &[ToolDescriptor]) -> String {
    if descriptors.is_empty() {
        return "No tools are available.".to_string();
    }

    let mut out = String::from("Available tools:");
    for d in descriptors {
        out.push_str(&format!("\n\nTool: {}\nDescription: {}", d.name, d.description));
        let params: Vec<String> = d
            .parameters()
            .into_iter()
            .map(|p| {
                let mut line = p.name;
                if p.required {
                    line.push_str(" (required)");
                }
                if !p.description.is_empty() {
                    line.push_str(" - ");
                    line.push_str(&p.description);
                }
                line
            })
            .collect();
        if !params.is_empty() {
            out.push_str(&format!("\nParameters: {}", params.join("; ")));
        }
    }
    out
}

// ── tools/call ─────────────────────────────────────────────────────

/// Flat string arguments of one invocation, ordered by key.
pub type Arguments = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default, deserialize_with = "coerced_arguments")]
    pub arguments: Arguments,
}

/// Render one argument value as the string a tool receives. Strings pass
/// through unquoted; everything else becomes its compact JSON text.
pub fn coerce_argument(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerced_arguments<'de, D>(deserializer: D) -> Result<Arguments, D::Error>
where
    D: Deserializer<'de>,
{
    struct ArgumentsVisitor;

    impl<'de> Visitor<'de> for ArgumentsVisitor {
        type Value = Arguments;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object of arguments or null")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Arguments, E> {
            Ok(Arguments::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Arguments, E> {
            Ok(Arguments::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Arguments, A::Error> {
            let mut out = Arguments::new();
            while let Some((key, value)) = map.next_entry::<String, Value>()? {
                out.insert(key, coerce_argument(&value));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(ArgumentsVisitor)
}

/// One content block of a call result. Only text is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// All text blocks joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_outcome(self) -> ToolOutcome {
        ToolOutcome {
            text: self.text(),
            is_error: self.is_error,
        }
    }
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        Self {
            content: vec![Content::Text { text: outcome.text }],
            is_error: outcome.is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_id_is_distinct_from_missing_id() {
        let with_null: Message =
            serde_json::from_str(r#"{"version":"1.0","id":null,"method":"tools/list"}"#).unwrap();
        assert_eq!(with_null.id, Some(RequestId::Null));
        assert!(!with_null.is_notification());

        let without: Message =
            serde_json::from_str(r#"{"version":"1.0","method":"tools/list"}"#).unwrap();
        assert_eq!(without.id, None);
        assert!(without.is_notification());
    }

    #[test]
    fn reply_serializes_null_id() {
        let reply = Message::reply(RequestId::Null, json!({}));
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(wire["id"], Value::Null);
        assert!(wire.as_object().unwrap().contains_key("id"));
        assert!(!wire.as_object().unwrap().contains_key("method"));
    }

    #[test]
    fn string_and_number_ids_round_trip() {
        let msg: Message = serde_json::from_str(r#"{"id":"abc","method":"x"}"#).unwrap();
        assert_eq!(msg.id, Some(RequestId::from("abc")));
        let msg: Message = serde_json::from_str(r#"{"id":7,"method":"x"}"#).unwrap();
        assert_eq!(msg.id, Some(RequestId::from(7u64)));
        assert_eq!(serde_json::to_value(&msg).unwrap()["id"], json!(7));
    }

    #[test]
    fn jsonrpc_field_is_accepted_as_version() {
        let msg: Message =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).unwrap();
        assert_eq!(msg.version, "2.0");
        let missing: Message = serde_json::from_str(r#"{"id":1,"method":"x"}"#).unwrap();
        assert_eq!(missing.version, WIRE_VERSION);
    }

    #[test]
    fn call_params_coerce_non_string_arguments() {
        let params: CallToolParams = serde_json::from_value(json!({
            "name": "weather",
            "arguments": {"city": "Paris", "days": 3, "metric": true, "extra": {"a": [1]}}
        }))
        .unwrap();
        assert_eq!(params.arguments["city"], "Paris");
        assert_eq!(params.arguments["days"], "3");
        assert_eq!(params.arguments["metric"], "true");
        assert_eq!(params.arguments["extra"], r#"{"a":[1]}"#);
    }

    #[test]
    fn call_params_tolerate_missing_or_null_arguments() {
        let params: CallToolParams = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(params.arguments.is_empty());
        let params: CallToolParams =
            serde_json::from_value(json!({"name": "x", "arguments": null})).unwrap();
        assert!(params.arguments.is_empty());
    }

    #[test]
    fn call_result_wire_shape() {
        let result = CallToolResult::from(ToolOutcome::error("boom"));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"content": [{"type": "text", "text": "boom"}], "isError": true})
        );
    }

    #[test]
    fn descriptor_parameters_mark_required() {
        let d = ToolDescriptor::new(
            "weather",
            "Current weather",
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"},
                    "units": {"type": "string"}
                },
                "required": ["city"]
            }),
        );
        let params = d.parameters();
        assert_eq!(params.len(), 2);
        let city = params.iter().find(|p| p.name == "city").unwrap();
        assert!(city.required);
        assert_eq!(city.description, "City name");
        assert!(!params.iter().find(|p| p.name == "units").unwrap().required);
    }

    #[test]
    fn catalog_lists_tools_and_parameters() {
        let weather = ToolDescriptor::new(
            "weather",
            "Get current weather for a city",
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"},
                    "units": {"type": "string"}
                },
                "required": ["city"]
            }),
        );
        let text = describe_catalog(&[
            weather,
            ToolDescriptor::new("get_current_day", "Today's weekday", json!({"type": "object"})),
        ]);
        assert!(text.starts_with("Available tools:"));
        assert!(text.contains("Tool: weather\nDescription: Get current weather for a city"));
        assert!(text.contains("Parameters: city (required) - City name; units"));
        assert!(text.contains("Tool: get_current_day"));
        assert_eq!(describe_catalog(&[]), "No tools are available.");
    }

    #[test]
    fn error_reply_into_result() {
        let reply = Message::error_reply(1u64.into(), RpcError::unknown_tool("nope"));
        let err = reply.into_result().unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert_eq!(err.message, "Unknown tool: nope");
    }
}
