//! Ollama `/api/generate` client.

use super::{Backend, BackendError, GenerateFuture};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gemma3";

/// Connection and sampling settings for [`OllamaBackend`].
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// `None` leaves the model's default in place.
    pub temperature: Option<f32>,
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Defaults, overridden by `OLLAMA_HOST` and `OLLAMA_MODEL` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            config.base_url = normalize_host(&host);
        }
        if let Some(model) = lookup("OLLAMA_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = normalize_host(&url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

/// `OLLAMA_HOST` is commonly given as a bare `host:port`.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Non-streaming client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(BackendError::Request)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str, system_prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            system: system_prompt,
            stream: false,
            options: self
                .config
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        };
        debug!(
            "LLM request: model={}, prompt={} chars, system={} chars",
            self.config.model,
            prompt.chars().count(),
            system_prompt.chars().count(),
        );
        trace!("Prompt:\n{prompt}");

        let start = Instant::now();
        let resp = self
            .client
            .post(self.config.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(BackendError::Request)?;

        let status = resp.status();
        let text = resp.text().await.map_err(BackendError::Request)?;
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(BackendError::Decode(format!("Ollama error: {error}")));
        }
        debug!(
            "Token usage: prompt={}, completion={}",
            parsed.prompt_eval_count.unwrap_or(0),
            parsed.eval_count.unwrap_or(0),
        );
        trace!("Model output:\n{}", parsed.response);
        Ok(parsed.response)
    }
}

impl Backend for OllamaBackend {
    fn generate<'a>(&'a self, prompt: &'a str, system_prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.complete(prompt, system_prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_target_local_server() {
        let config = OllamaConfig::default();
        assert_eq!(config.endpoint(), "http://localhost:11434/api/generate");
        assert_eq!(config.model, "gemma3");
    }

    #[test]
    fn env_overrides_host_and_model() {
        let env: HashMap<&str, &str> =
            HashMap::from([("OLLAMA_HOST", "gpu-box:11434"), ("OLLAMA_MODEL", "llama3.2")]);
        let config = OllamaConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, "llama3.2");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = OllamaConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = OllamaConfig::default().with_base_url("https://ollama.example.com/");
        assert_eq!(config.endpoint(), "https://ollama.example.com/api/generate");
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            model: "gemma3",
            prompt: "p",
            system: "s",
            stream: false,
            options: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"model": "gemma3", "prompt": "p", "system": "s", "stream": false})
        );
    }
}
