//! YAML workflow definitions.
//!
//! A definition names its agents by catalog id, display name or kind and is
//! resolved against an [`AgentCatalog`] before it can run or be stored:
//!
//! ```yaml
//! name: "Meeting Follow-up"
//! description: "Summarize a call and draft the follow-up email"
//! category: productivity
//!
//! steps:
//!   - agent: meeting_summarizer
//!     config:
//!       summary_length: short
//!   - agent: "Smart Email Manager"
//!     config:
//!       mode: draft_response
//!       response_tone: "${TONE}"
//! ```
//!
//! String config values support `${ENV_VAR}` references.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::resolve_env_vars;
use crate::error::FlowError;
use crate::models::{CreateWorkflowInput, Payload, StepInput, WorkflowSpec, WorkflowStep};
use crate::store::AgentCatalog;

/// Top-level workflow definition loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Knowledge domain, e.g. `productivity` or `marketing`.
    #[serde(default)]
    pub category: Option<String>,

    pub steps: Vec<StepDefinition>,
}

/// One step: which agent, how to configure it, and where it sits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Display name or kind (`"meeting_summarizer"`).
    #[serde(default)]
    pub agent: Option<String>,

    #[serde(default)]
    pub agent_id: Option<i64>,

    #[serde(default)]
    pub config: Payload,

    /// Defaults to the step's position in the list.
    #[serde(default)]
    pub order: Option<i64>,
}

impl WorkflowDefinition {
    pub fn from_yaml(yaml: &str) -> Result<Self, FlowError> {
        let def: Self = serde_yaml::from_str(yaml)
            .map_err(|e| FlowError::BadRequest(format!("Failed to parse workflow YAML: {}", e)))?;
        if def.steps.is_empty() {
            return Err(FlowError::BadRequest(format!(
                "Workflow '{}' has no steps",
                def.name
            )));
        }
        Ok(def)
    }

    pub fn from_file(path: &Path) -> Result<Self, FlowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::BadRequest(format!("Failed to read workflow file {:?}: {}", path, e))
        })?;
        Self::from_yaml(&content)
    }

    /// Resolve agents against the catalog into store-ready step inputs.
    pub async fn resolve_steps(
        &self,
        catalog: &dyn AgentCatalog,
    ) -> Result<Vec<StepInput>, FlowError> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let agent = match (step.agent_id, step.agent.as_deref()) {
                (Some(id), _) => catalog.get_agent(id).await?,
                (None, Some(name)) => catalog.find_agent(name).await?,
                (None, None) => {
                    return Err(FlowError::BadRequest(format!(
                        "Step {} must name an agent or agent_id",
                        i + 1
                    )))
                }
            };
            let agent = agent.ok_or_else(|| {
                FlowError::NotFound(format!(
                    "Unknown agent '{}' in step {}",
                    step.agent
                        .clone()
                        .or_else(|| step.agent_id.map(|id| id.to_string()))
                        .unwrap_or_default(),
                    i + 1
                ))
            })?;

            steps.push(StepInput {
                agent_id: agent.id,
                config: resolve_config(&step.config),
                order: step.order.unwrap_or(i as i64),
            });
        }
        Ok(steps)
    }

    /// Resolve into an unsaved workflow (id 0) that the engine can run directly.
    pub async fn resolve(&self, catalog: &dyn AgentCatalog) -> Result<WorkflowSpec, FlowError> {
        let now = Utc::now();
        let steps = self
            .resolve_steps(catalog)
            .await?
            .into_iter()
            .enumerate()
            .map(|(i, s)| WorkflowStep {
                id: i as i64,
                agent_id: s.agent_id,
                config: s.config,
                order: s.order,
            })
            .collect();

        Ok(WorkflowSpec {
            id: 0,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            is_template: false,
            steps,
            created_at: now,
            updated_at: now,
        })
    }

    /// Resolve into a create request for the workflow store.
    pub async fn to_create_input(
        &self,
        catalog: &dyn AgentCatalog,
    ) -> Result<CreateWorkflowInput, FlowError> {
        Ok(CreateWorkflowInput {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            is_template: false,
            steps: self.resolve_steps(catalog).await?,
        })
    }
}

fn resolve_config(config: &Payload) -> Payload {
    config
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => Value::String(resolve_env_vars(s)),
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect()
}
