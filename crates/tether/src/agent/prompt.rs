//! System prompt assembly.
//!
//! [`SystemPromptBuilder`] joins a preamble and `## Heading` sections;
//! [`system_prompt`] uses it to describe the catalog and teach the model the
//! invocation encoding selected by [`ParseStrategy`].

use super::parser::ParseStrategy;
use crate::protocol::{ToolDescriptor, describe_catalog};

/// Appended to every reasoning prompt after the transcript.
pub const NEXT_STEP_CUE: &str = "What should we do next?";

const PREAMBLE: &str = "You are a helpful assistant that completes tasks step by step. \
You can use external tools to look up information you do not have. \
Think about what you need, use a tool when it helps, and answer the task \
once you have enough information.";

/// Builder for multi-section system prompts.
///
/// Sections are joined with blank lines. Empty sections are skipped.
///
/// ```
/// use tether::agent::prompt::SystemPromptBuilder;
///
/// let prompt = SystemPromptBuilder::new("You are a helpful agent.")
///     .section("Context", "Today is Monday.")
///     .section_if(false, "Hidden", || "never built".into())
///     .section_opt("Notes", None::<String>)
///     .build();
///
/// assert!(prompt.contains("## Context"));
/// assert!(!prompt.contains("## Hidden"));
/// assert!(!prompt.contains("## Notes"));
/// ```
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    sections: Vec<String>,
}

impl SystemPromptBuilder {
    /// Start with a preamble, included as-is without a heading.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    /// Append a section only when `condition` holds. `content_fn` is not
    /// called otherwise.
    pub fn section_if(
        self,
        condition: bool,
        heading: &str,
        content_fn: impl FnOnce() -> String,
    ) -> Self {
        if condition {
            self.section(heading, content_fn())
        } else {
            self
        }
    }

    pub fn section_opt(self, heading: &str, content: Option<impl Into<String>>) -> Self {
        match content {
            Some(c) => self.section(heading, c),
            None => self,
        }
    }

    pub fn build(self) -> String {
        self.sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn encoding_guide(strategy: ParseStrategy) -> String {
    match strategy {
        ParseStrategy::FencedJson => "To use a tool, reply with a JSON code block in exactly this format:\n\n\
```json\n\
{\"tool\": \"tool_name\", \"parameters\": {\"param1\": \"value1\", \"param2\": \"value2\"}}\n\
```\n\n\
For example, to get the weather in Paris:\n\n\
```json\n\
{\"tool\": \"weather\", \"parameters\": {\"city\": \"Paris\"}}\n\
```"
            .to_string(),
        ParseStrategy::XmlTags => "To use a tool, reply with a tool_use block in exactly this format:\n\n\
<tool_use>\n\
<tool_name>tool_name</tool_name>\n\
<param1>value1</param1>\n\
</tool_use>\n\n\
For example, to get the weather in Paris:\n\n\
<tool_use>\n\
<tool_name>weather</tool_name>\n\
<city>Paris</city>\n\
</tool_use>"
            .to_string(),
    }
}

const RULES: &str = "- Use ONLY ONE tool per response.\n\
- After requesting a tool, stop and wait. The result will be shown to you as an Observation.\n\
- Use the observations to decide your next step.\n\
- When you have enough information, reply with the final answer in plain text and no tool call.";

/// The fixed system prompt for one run.
pub fn system_prompt(
    catalog: &[ToolDescriptor],
    strategy: ParseStrategy,
    instructions: Option<&str>,
) -> String {
    SystemPromptBuilder::new(PREAMBLE)
        .section("Tools", describe_catalog(catalog))
        .section_if(!catalog.is_empty(), "Calling a tool", || {
            encoding_guide(strategy)
        })
        .section_if(!catalog.is_empty(), "Rules", || RULES.to_string())
        .section_opt("Instructions", instructions)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather() -> ToolDescriptor {
        ToolDescriptor::new(
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
        )
    }

    #[test]
    fn empty_catalog_is_stated() {
        let prompt = system_prompt(&[], ParseStrategy::FencedJson, None);
        assert!(prompt.contains("No tools are available."));
        assert!(!prompt.contains("## Calling a tool"));
    }

    #[test]
    fn prompt_teaches_selected_encoding() {
        let catalog = [weather()];
        let json_prompt = system_prompt(&catalog, ParseStrategy::FencedJson, None);
        assert!(json_prompt.contains("\"parameters\""));
        assert!(json_prompt.contains("ONLY ONE tool"));
        assert!(!json_prompt.contains("<tool_use>"));

        let xml_prompt = system_prompt(&catalog, ParseStrategy::XmlTags, Some("Be brief."));
        assert!(xml_prompt.contains("<tool_use>"));
        assert!(xml_prompt.contains("## Instructions\n\nBe brief."));
    }

    #[test]
    fn example_invocations_parse_with_their_strategy() {
        use super::super::parser::InvocationParser;
        for strategy in [ParseStrategy::FencedJson, ParseStrategy::XmlTags] {
            let inv = InvocationParser::new(strategy)
                .parse(&encoding_guide(strategy))
                .unwrap();
            assert_eq!(inv.name, "tool_name");
        }
    }
}
