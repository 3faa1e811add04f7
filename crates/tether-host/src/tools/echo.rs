use schemars::JsonSchema;
use serde::Deserialize;
use tether::json_schema_for;
use tether::protocol::ToolDescriptor;
use tether::tools::{FnTool, ToolOutcome};

/// Arguments for `echo`.
#[derive(Deserialize, JsonSchema)]
pub struct EchoArgs {
    /// Text to return unchanged.
    pub text: String,
}

/// Returns its input unchanged. Useful for checking a host is alive.
pub fn echo() -> FnTool {
    FnTool::new(
        ToolDescriptor::new(
            super::ECHO,
            "Return the given text unchanged",
            json_schema_for::<EchoArgs>(),
        ),
        |args: EchoArgs| async move { ToolOutcome::text(args.text) },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether::protocol::Arguments;
    use tether::tools::Tool;

    #[tokio::test]
    async fn echoes_text_verbatim() {
        let args = [("text".to_string(), "42".to_string())].into_iter().collect();
        let outcome = echo().execute(&args).await;
        assert_eq!(outcome, ToolOutcome::text("42"));
    }

    #[tokio::test]
    async fn missing_text_is_an_error() {
        let outcome = echo().execute(&Arguments::new()).await;
        assert!(outcome.is_error);
        assert!(outcome.text.contains("text"));
    }

    #[test]
    fn descriptor_requires_text() {
        let params = echo().descriptor().parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "text");
        assert!(params[0].required);
    }
}
