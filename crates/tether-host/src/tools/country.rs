use super::{endpoint, fetch_json};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tether::json_schema_for;
use tether::protocol::{Arguments, ToolDescriptor};
use tether::tools::{Tool, ToolFuture, ToolOutcome, parse_args};
use tracing::debug;

const REST_COUNTRIES_URL: &str = "https://restcountries.com/v3.1/name";

/// Arguments for `country_info`.
#[derive(Deserialize, JsonSchema)]
pub struct CountryInfoArgs {
    /// Country name (e.g. 'France', 'Japan').
    pub country: String,
}

/// Capital, population, region, languages and currencies of a country,
/// from the REST Countries API.
pub struct CountryInfo {
    http: reqwest::Client,
    base_url: String,
}

impl CountryInfo {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: REST_COUNTRIES_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Tool for CountryInfo {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            super::COUNTRY_INFO,
            "Get facts about a country: capital, population, region, languages and currencies",
            json_schema_for::<CountryInfoArgs>(),
        )
    }

    fn execute(&self, arguments: &Arguments) -> ToolFuture<'_> {
        let parsed = parse_args::<CountryInfoArgs>(arguments);
        Box::pin(async move {
            let args = match parsed {
                Ok(a) => a,
                Err(e) => return ToolOutcome::error(e),
            };
            let country = args.country.trim();
            if country.is_empty() {
                return ToolOutcome::error("Error: 'country' must not be empty");
            }

            let url = match endpoint(&self.base_url, country, &[]) {
                Ok(u) => u,
                Err(e) => return ToolOutcome::error(e),
            };
            debug!("GET {url}");
            match fetch_json(&self.http, url).await {
                Ok(body) => format_country(country, &body).into(),
                Err(e) => ToolOutcome::error(format!(
                    "Error: could not find information for country '{country}': {e}"
                )),
            }
        })
    }
}

/// Render the first match of a REST Countries response as one line.
pub fn format_country(query: &str, body: &Value) -> Result<String, String> {
    let Some(entry) = body.as_array().and_then(|matches| matches.first()) else {
        return Err(format!("Error: no information found for country '{query}'"));
    };

    let name = entry
        .pointer("/name/common")
        .and_then(Value::as_str)
        .unwrap_or(query);
    let capital = entry
        .pointer("/capital/0")
        .and_then(Value::as_str)
        .unwrap_or("N/A");
    let population = entry
        .get("population")
        .and_then(Value::as_u64)
        .map(group_thousands)
        .unwrap_or_else(|| "N/A".into());
    let region = entry.get("region").and_then(Value::as_str).unwrap_or("N/A");

    let languages = entry
        .get("languages")
        .and_then(Value::as_object)
        .map(|langs| {
            langs
                .values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "N/A".into());

    let currencies = entry
        .get("currencies")
        .and_then(Value::as_object)
        .map(|currencies| {
            currencies
                .values()
                .filter_map(|c| {
                    let name = c.get("name").and_then(Value::as_str)?;
                    Some(match c.get("symbol").and_then(Value::as_str) {
                        Some(symbol) if !symbol.is_empty() => format!("{name} ({symbol})"),
                        _ => name.to_string(),
                    })
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "N/A".into());

    Ok(format!(
        "{name} - Capital: {capital}, Population: {population}, Region: {region}, \
         Languages: {languages}, Currencies: {currencies}"
    ))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
