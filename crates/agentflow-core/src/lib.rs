//! Agentflow Core: agents, schemas, stores and the workflow execution engine.
//!
//! Agents are small payload-to-payload transforms (meeting summarizer,
//! email manager, SEO optimizer, grammar checker, meeting scheduler) chained
//! into sequential workflows. The crate has no HTTP server; the CLI and any
//! embedding service drive it through [`WorkflowEngine`].

pub mod agents;
pub mod config;
pub mod db;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod schema;
pub mod state;
pub mod store;
pub mod workflow;

// Convenience re-exports
pub use config::AppConfig;
pub use db::Database;
pub use error::{AgentError, FlowError};
pub use state::{AppState, AppStateInner};
pub use workflow::WorkflowEngine;
