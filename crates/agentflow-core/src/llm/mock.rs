use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmClient, LlmError};

/// In-memory [`LlmClient`] with canned replies and no network access.
///
/// Replies are chosen by the first rule whose needle occurs in the prompt,
/// falling back to the default reply. With no default every unmatched call
/// fails with [`LlmError::Unavailable`], which drives agents onto their
/// heuristic paths.
pub struct MockLlmClient {
    rules: Vec<(String, Result<String, LlmError>)>,
    default_reply: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Answer every prompt with the same text.
    pub fn new(default_reply: &str) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: Some(default_reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail every prompt.
    pub fn unavailable() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `reply` when the prompt contains `needle`.
    pub fn with_reply(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(reply.to_string())));
        self
    }

    /// Fail with `error` when the prompt contains `needle`.
    pub fn with_failure(mut self, needle: &str, error: LlmError) -> Self {
        self.rules.push((needle.to_string(), Err(error)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some((_, reply)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle)) {
            return reply.clone();
        }
        match &self.default_reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(LlmError::Unavailable("offline mock".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
