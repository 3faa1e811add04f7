//! Text generation backends consumed by the reasoning loop.
//!
//! A [`Backend`] turns a prompt and a system prompt into free text. The
//! agent never inspects how; it only parses what comes back.

mod ollama;
mod scripted;

pub use ollama::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, OllamaBackend, OllamaConfig};
pub use scripted::ScriptedBackend;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Backend::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;

/// A language model that completes one prompt at a time.
pub trait Backend: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str, system_prompt: &'a str) -> GenerateFuture<'a>;
}

/// Why a generation request produced no text.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse backend response: {0}")]
    Decode(String),

    /// A scripted backend ran out of replies.
    #[error("no scripted reply left")]
    Exhausted,
}
