//! Extracting a tool invocation from free model text.
//!
//! Two encodings are understood, selected by [`ParseStrategy`]:
//!
//! ```text
//! XmlTags:     <tool_use><tool_name>weather</tool_name><city>Paris</city></tool_use>
//!
//! FencedJson:  ```json
//!              {"tool": "weather", "parameters": {"city": "Paris"}}
//!              ```
//! ```
//!
//! At most one invocation is honored per reply: the first well-formed one.
//! A block that is cut off or does not parse yields no invocation, and the
//! reply is then taken as the final answer.

use crate::protocol::{Arguments, coerce_argument};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static TOOL_USE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_use>(.*?)</tool_use>").expect("tool_use pattern is valid")
});
static TOOL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_name>\s*(.*?)\s*</tool_name>").expect("tool_name pattern is valid")
});
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z_][A-Za-z0-9_.\-]*)>").expect("open tag pattern is valid")
});
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+.\-]*\s*(.*?)```").expect("fence pattern is valid")
});

/// One parsed tool request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub arguments: Arguments,
}

/// Which invocation encoding the model is taught and parsed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseStrategy {
    /// `<tool_use>` blocks with one child tag per parameter.
    XmlTags,
    /// A fenced JSON object with `tool` and `parameters`.
    #[default]
    FencedJson,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseStrategy::XmlTags => "xml",
            ParseStrategy::FencedJson => "json",
        })
    }
}

impl FromStr for ParseStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" | "xml-tags" | "xml_tags" => Ok(ParseStrategy::XmlTags),
            "json" | "fenced-json" | "fenced_json" => Ok(ParseStrategy::FencedJson),
            other => Err(format!(
                "unknown parse strategy '{other}' (expected 'xml' or 'json')"
            )),
        }
    }
}

/// Finds the first invocation in a model reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvocationParser {
    strategy: ParseStrategy,
}

impl InvocationParser {
    pub fn new(strategy: ParseStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ParseStrategy {
        self.strategy
    }

    pub fn parse(&self, text: &str) -> Option<Invocation> {
        match self.strategy {
            ParseStrategy::XmlTags => parse_xml(text),
            ParseStrategy::FencedJson => parse_json(text),
        }
    }
}

// ── XmlTags ────────────────────────────────────────────────────────

fn parse_xml(text: &str) -> Option<Invocation> {
    TOOL_USE_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| xml_block(body.as_str()))
}

fn xml_block(body: &str) -> Option<Invocation> {
    let name = TOOL_NAME.captures(body)?.get(1)?.as_str().trim();
    if name.is_empty() {
        return None;
    }

    let mut arguments = Arguments::new();
    let mut pos = 0;
    while let Some(open) = body.get(pos..).and_then(|rest| OPEN_TAG.captures(rest)) {
        let (Some(whole), Some(tag)) = (open.get(0), open.get(1)) else {
            break;
        };
        let value_start = pos + whole.end();
        let closing = format!("</{}>", tag.as_str());
        match body.get(value_start..).and_then(|rest| rest.find(&closing)) {
            Some(len) => {
                if tag.as_str() != "tool_name" {
                    let value = body.get(value_start..value_start + len).unwrap_or_default();
                    arguments.insert(tag.as_str().to_string(), value.trim().to_string());
                }
                pos = value_start + len + closing.len();
            }
            // Unclosed tag: skip it and keep scanning.
            None => pos = value_start,
        }
    }

    Some(Invocation {
        name: name.to_string(),
        arguments,
    })
}

// ── FencedJson ─────────────────────────────────────────────────────

fn parse_json(text: &str) -> Option<Invocation> {
    let mut fences = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .peekable();

    if fences.peek().is_some() {
        return fences.find_map(|block| {
            serde_json::from_str::<Value>(block.as_str().trim())
                .ok()
                .and_then(|v| json_invocation(&v))
        });
    }
    // An opened but unterminated fence is a truncated reply.
    if text.contains("```") {
        return None;
    }
    bare_json(text)
}

/// Scan for the first standalone JSON object that encodes an invocation.
fn bare_json(text: &str) -> Option<Invocation> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| {
            let rest = text.get(start..)?;
            let value = serde_json::Deserializer::from_str(rest)
                .into_iter::<Value>()
                .next()?
                .ok()?;
            json_invocation(&value)
        })
}

fn json_invocation(value: &Value) -> Option<Invocation> {
    let object = value.as_object()?;
    let name = object.get("tool")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let arguments = match object.get("parameters") {
        None | Some(Value::Null) => Arguments::new(),
        Some(Value::Object(params)) => params
            .iter()
            .map(|(k, v)| (k.clone(), coerce_argument(v)))
            .collect(),
        Some(_) => return None,
    };
    Some(Invocation {
        name: name.to_string(),
        arguments,
    })
}
