use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A loosely-typed JSON object flowing between agents.
pub type Payload = serde_json::Map<String, Value>;

/// The generic envelope a caller hands to a workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowInput {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub context: Payload,
}

impl WorkflowInput {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, key: &str, value: &str) -> Self {
        self.variables.insert(key.to_string(), value.to_string());
        self
    }
}

/// A file supplied alongside a workflow input.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.map(|c| c.to_string()),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some("txt") | Some("log") => Some("text/plain"),
            Some("md") => Some("text/markdown"),
            Some("csv") => Some("text/csv"),
            Some("html") | Some("htm") => Some("text/html"),
            Some("json") => Some("application/json"),
            Some("pdf") => Some("application/pdf"),
            _ => None,
        };
        Ok(Self::new(&filename, content_type, bytes))
    }

    /// Only text-typed uploads contribute their content.
    pub fn is_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|c| c.contains("text"))
            .unwrap_or(false)
    }

    /// File extension including the leading dot, or empty.
    pub fn suffix(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default()
    }
}

/// A recorded step failure. Never fatal to the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepError {
    pub step: usize,
    pub agent_id: i64,
    pub agent_name: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Payload>,
}

/// A recorded schema repair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adaptation {
    pub step: usize,
    pub agent_id: i64,
    pub agent_name: String,
    pub message: String,
}

/// A document an agent publishes for later retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeItem {
    pub collection: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Payload,
}

/// An external effect performed by a step (e.g. a meeting was booked).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SideEffectRecord {
    #[serde(default)]
    pub step: usize,
    #[serde(default)]
    pub agent_id: i64,
    pub agent_name: String,
    pub action: String,
    pub target: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Knowledge collections visible to a run plus what its agents published.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagContext {
    pub shared_collections: Vec<String>,
    pub domain_collections: Vec<String>,
    pub generated_knowledge: BTreeMap<String, Vec<KnowledgeItem>>,
}

/// Accumulator threaded through one workflow run.
///
/// Agents only ever see it by shared reference; the engine owns all writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// `None` for ad-hoc runs of unsaved steps.
    pub workflow_id: Option<i64>,
    pub workflow_name: String,
    pub original_input: Payload,
    pub user_prompt: String,
    pub intermediate_results: Payload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StepError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adaptations: Vec<Adaptation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effects: Vec<SideEffectRecord>,
    pub rag_context: RagContext,
}

impl ExecutionContext {
    pub fn new(
        workflow_id: Option<i64>,
        workflow_name: &str,
        original_input: Payload,
        user_prompt: &str,
    ) -> Self {
        Self {
            workflow_id,
            workflow_name: workflow_name.to_string(),
            original_input,
            user_prompt: user_prompt.to_string(),
            ..Default::default()
        }
    }

    /// The caller's free-text prompt, for agents that want global context.
    pub fn original_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Outcome of a run: the last step's output plus the accumulated context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub final_output: Payload,
    pub context: ExecutionContext,
}

/// Outcome of previewing a single agent on an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResult {
    pub status: String,
    pub agent_id: i64,
    pub agent_name: String,
    pub input: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
