use super::{Backend, BackendError, GenerateFuture};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A backend that plays back canned replies in order.
///
/// Once the queue is empty it repeats the fallback reply, if one was set,
/// and otherwise fails with [`BackendError::Exhausted`]. Every prompt it
/// receives is recorded for later inspection.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A backend that answers every prompt with the same text.
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new()).with_fallback(reply)
    }

    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Backend for ScriptedBackend {
    fn generate<'a>(&'a self, prompt: &'a str, _system_prompt: &'a str) -> GenerateFuture<'a> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        let next = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .or_else(|| self.fallback.clone());
        Box::pin(async move { next.ok_or(BackendError::Exhausted) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plays_replies_then_fallback() {
        let backend = ScriptedBackend::new(["one", "two"]).with_fallback("again");
        assert_eq!(backend.generate("p1", "s").await.unwrap(), "one");
        assert_eq!(backend.generate("p2", "s").await.unwrap(), "two");
        assert_eq!(backend.generate("p3", "s").await.unwrap(), "again");
        assert_eq!(backend.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn exhausted_without_fallback() {
        let backend = ScriptedBackend::new(["only"]);
        backend.generate("p", "s").await.unwrap();
        assert!(matches!(
            backend.generate("p", "s").await,
            Err(BackendError::Exhausted)
        ));
    }
}
