//! Agent variants and the contract the engine drives them through.
//!
//! Every agent is a transform from a loosely-typed payload to another. An
//! agent sees the run's [`ExecutionContext`] read-only; anything it wants to
//! contribute back (published knowledge, a record of an external effect) is
//! exposed through the optional hooks and folded in by the engine.

pub mod email_manager;
pub mod grammar_checker;
pub mod scheduler;
pub mod seo_optimizer;
pub mod summarizer;
pub mod text;

pub use email_manager::EmailManager;
pub use grammar_checker::GrammarChecker;
pub use scheduler::MeetingScheduler;
pub use seo_optimizer::SeoOptimizer;
pub use summarizer::MeetingSummarizer;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::models::{AgentKind, ExecutionContext, KnowledgeItem, Payload, SideEffectRecord};
use crate::schema::SchemaSpec;

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> AgentKind;

    fn input_schema(&self) -> SchemaSpec;

    fn output_schema(&self) -> SchemaSpec;

    fn config_schema(&self) -> SchemaSpec;

    /// Transform one step's input. Agents must tolerate missing fields and
    /// upstream error payloads.
    async fn process(
        &mut self,
        input: Payload,
        context: Option<&ExecutionContext>,
    ) -> Result<Payload, AgentError>;

    /// Knowledge produced by the last `process` call.
    fn published_knowledge(&self) -> Vec<KnowledgeItem> {
        Vec::new()
    }

    /// External effect performed by the last `process` call.
    fn side_effect(&self) -> Option<SideEffectRecord> {
        None
    }
}

pub(crate) fn config_str(config: &Payload, key: &str, default: &str) -> String {
    config
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

pub(crate) fn config_bool(config: &Payload, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Unwrap a `json!({...})` literal into a payload.
pub(crate) fn into_payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// Build a knowledge item with string metadata.
pub(crate) fn knowledge_item(
    collection: &str,
    document: String,
    metadata: &[(&str, &str)],
) -> KnowledgeItem {
    KnowledgeItem {
        collection: collection.to_string(),
        document,
        metadata: metadata
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    }
}
