//! Core error types for agentflow.
//!
//! `FlowError` is used by the stores, the agent registry and the engine's
//! entry points. Failures inside a running workflow are not `FlowError`s:
//! the engine records them as data in the `ExecutionContext` instead.
//! `AgentError` is what an individual agent's `process` call may return.

use crate::llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for FlowError {
    fn from(e: rusqlite::Error) -> Self {
        FlowError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        FlowError::Internal(format!("JSON error: {}", e))
    }
}

/// Error raised by an agent while processing a single step.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{0}")]
    Internal(String),
}
