//! Text generation capability shared by all agents.
//!
//! Agents depend on [`LlmClient`] only; the concrete backend is chosen from
//! [`LlmConfig`](crate::config::LlmConfig) by [`build_client`].

pub mod http;
pub mod mock;
pub mod parse;

pub use http::HttpLlmClient;
pub use mock::MockLlmClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProvider};

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("LLM returned an empty response")]
    EmptyResponse,
    #[error("LLM configuration error: {0}")]
    Config(String),
    #[error("LLM unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a single user prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Generate with a per-call model override. Backends that cannot switch
    /// models ignore the override.
    async fn generate_with_model(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, LlmError> {
        let _ = model;
        self.generate(prompt).await
    }

    /// The default model label.
    fn model(&self) -> &str;
}

/// Build the configured backend.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Mock => {
            tracing::info!("[LlmClient] Using offline mock backend");
            Ok(Arc::new(MockLlmClient::unavailable()))
        }
        _ => Ok(Arc::new(HttpLlmClient::new(config)?)),
    }
}
