use super::{endpoint, fetch_json};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tether::json_schema_for;
use tether::protocol::{Arguments, ToolDescriptor};
use tether::tools::{Tool, ToolFuture, ToolOutcome, parse_args};
use tracing::debug;

const WTTR_URL: &str = "https://wttr.in";

/// Arguments for `weather`.
#[derive(Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// City name (e.g. 'Tokyo', 'New York').
    pub city: String,
}

/// Current conditions for a city, from wttr.in.
pub struct Weather {
    http: reqwest::Client,
    base_url: String,
}

impl Weather {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: WTTR_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Tool for Weather {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            super::WEATHER,
            "Get the current weather for a city: temperature, conditions, humidity and wind",
            json_schema_for::<WeatherArgs>(),
        )
    }

    fn execute(&self, arguments: &Arguments) -> ToolFuture<'_> {
        let parsed = parse_args::<WeatherArgs>(arguments);
        Box::pin(async move {
            let args = match parsed {
                Ok(a) => a,
                Err(e) => return ToolOutcome::error(e),
            };
            let city = args.city.trim();
            if city.is_empty() {
                return ToolOutcome::error("Error: 'city' must not be empty");
            }

            let url = match endpoint(&self.base_url, city, &[("format", "j1")]) {
                Ok(u) => u,
                Err(e) => return ToolOutcome::error(e),
            };
            debug!("GET {url}");
            let body: Value = match fetch_json(&self.http, url).await {
                Ok(v) => v,
                Err(e) => {
                    return ToolOutcome::error(format!("Error fetching weather for {city}: {e}"));
                }
            };
            format_weather(city, &body).into()
        })
    }
}

/// Render a wttr.in `format=j1` body as one line.
pub fn format_weather(city: &str, body: &Value) -> Result<String, String> {
    let current = body
        .pointer("/current_condition/0")
        .ok_or_else(|| format!("Error: no current conditions reported for {city}"))?;
    let field = |name: &str| {
        current
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string()
    };
    let description = current
        .pointer("/weatherDesc/0/value")
        .and_then(Value::as_str)
        .unwrap_or("unknown conditions")
        .trim();

    Ok(format!(
        "{city}: {}°C (feels like {}°C), {description}. Humidity: {}%, Wind: {} km/h",
        field("temp_C"),
        field("FeelsLikeC"),
        field("humidity"),
        field("windspeedKmph"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_current_condition() {
        let body = json!({
            "current_condition": [{
                "temp_C": "18",
                "FeelsLikeC": "17",
                "humidity": "72",
                "windspeedKmph": "11",
                "weatherDesc": [{ "value": "Partly cloudy " }]
            }]
        });
        assert_eq!(
            format_weather("Tokyo", &body).unwrap(),
            "Tokyo: 18°C (feels like 17°C), Partly cloudy. Humidity: 72%, Wind: 11 km/h"
        );
    }

    #[test]
    fn missing_fields_degrade() {
        let body = json!({ "current_condition": [{ "temp_C": "3" }] });
        let line = format_weather("Oslo", &body).unwrap();
        assert!(line.starts_with("Oslo: 3°C (feels like ?°C), unknown conditions."));
    }

    #[test]
    fn empty_body_is_an_error() {
        assert!(format_weather("Nowhere", &json!({})).is_err());
    }

    #[tokio::test]
    async fn blank_city_is_rejected_without_a_request() {
        let tool = Weather::new(reqwest::Client::new()).with_base_url("http://127.0.0.1:9");
        let args = [("city".to_string(), "  ".to_string())].into_iter().collect();
        let outcome = tool.execute(&args).await;
        assert!(outcome.is_error);
        assert!(outcome.text.contains("must not be empty"));
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error_outcome() {
        let tool = Weather::new(reqwest::Client::new()).with_base_url("http://127.0.0.1:9");
        let args = [("city".to_string(), "Paris".to_string())].into_iter().collect();
        let outcome = tool.execute(&args).await;
        assert!(outcome.is_error);
        assert!(outcome.text.starts_with("Error fetching weather for Paris"));
    }
}
