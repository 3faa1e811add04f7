//! Built-in tools served by `tether-host`.

mod country;
mod day;
mod echo;
mod weather;

pub use country::{CountryInfo, CountryInfoArgs, format_country};
pub use day::CurrentDay;
pub use echo::{EchoArgs, echo};
pub use weather::{Weather, WeatherArgs, format_weather};

use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

// ── Tool name constants ────────────────────────────────────────────

pub const ECHO: &str = "echo";
pub const CURRENT_DAY: &str = "current_day";
pub const WEATHER: &str = "weather";
pub const COUNTRY_INFO: &str = "country_info";

/// Every built-in tool name, in registration order.
pub const ALL: &[&str] = &[ECHO, CURRENT_DAY, WEATHER, COUNTRY_INFO];

/// HTTP client shared by the network tools.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tether-host/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// `base` with `segment` appended as one percent-encoded path segment.
pub(crate) fn endpoint(base: &str, segment: &str, query: &[(&str, &str)]) -> Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| format!("Error: invalid service URL {base}: {e}"))?;
    url.path_segments_mut()
        .map_err(|_| format!("Error: invalid service URL {base}"))?
        .pop_if_empty()
        .push(segment);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// GET a URL and decode the body as JSON, turning non-2xx into an error.
pub(crate) async fn fetch_json(http: &reqwest::Client, url: Url) -> Result<Value, String> {
    let response = http.get(url).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }
    response.json().await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_one_path_segment() {
        let url = endpoint("https://wttr.in", "New York", &[("format", "j1")]).unwrap();
        assert_eq!(url.as_str(), "https://wttr.in/New%20York?format=j1");
        let url = endpoint("http://localhost:8080/v3.1/name/", "a/b", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v3.1/name/a%2Fb");
    }
}
