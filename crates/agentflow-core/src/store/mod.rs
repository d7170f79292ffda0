//! SQLite-backed agent catalog and workflow store.
//!
//! The execution engine only needs lookup-by-id, expressed as the
//! [`AgentCatalog`] and [`WorkflowSource`] traits so that tests and
//! embedders can supply their own sources.

pub mod agent_store;
pub mod workflow_store;

pub use agent_store::{builtin_agents, AgentStore};
pub use workflow_store::WorkflowStore;

use async_trait::async_trait;

use crate::error::FlowError;
use crate::models::{AgentSpec, WorkflowSpec};

/// Source of agent catalog records keyed by integer id.
#[async_trait]
pub trait AgentCatalog: Send + Sync {
    async fn get_agent(&self, id: i64) -> Result<Option<AgentSpec>, FlowError>;

    async fn list_agents(&self) -> Result<Vec<AgentSpec>, FlowError>;

    /// Find an agent by display name or kind (e.g. `"meeting_summarizer"`).
    async fn find_agent(&self, name_or_kind: &str) -> Result<Option<AgentSpec>, FlowError> {
        let needle = name_or_kind.trim().to_lowercase();
        Ok(self.list_agents().await?.into_iter().find(|a| {
            a.name.to_lowercase() == needle || a.kind.as_str() == needle
        }))
    }
}

/// Source of stored workflows keyed by integer id.
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn get_workflow(&self, id: i64) -> Result<Option<WorkflowSpec>, FlowError>;
}
