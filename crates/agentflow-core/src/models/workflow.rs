use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::execution::Payload;

/// A stored workflow: an ordered chain of agent steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSpec {
    /// Steps in execution order: ascending `order`, ties by list position.
    pub fn ordered_steps(&self) -> Vec<&WorkflowStep> {
        let mut steps: Vec<&WorkflowStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }
}

/// One `(agent, config, order)` entry of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: i64,
    pub agent_id: i64,
    #[serde(default)]
    pub config: Payload,
    #[serde(default)]
    pub order: i64,
}

/// Step description used when creating or replacing workflow steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInput {
    pub agent_id: i64,
    #[serde(default)]
    pub config: Payload,
    #[serde(default)]
    pub order: i64,
}

/// Input for creating a new workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    pub steps: Vec<StepInput>,
}

/// Partial update input. `steps`, when present, replaces all steps.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateWorkflowInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub steps: Option<Vec<StepInput>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: i64, order: i64) -> WorkflowStep {
        WorkflowStep {
            id,
            agent_id: 1,
            config: Payload::new(),
            order,
        }
    }

    #[test]
    fn test_ordered_steps_stable_on_ties() {
        let now = Utc::now();
        let wf = WorkflowSpec {
            id: 1,
            name: "wf".to_string(),
            description: String::new(),
            category: None,
            is_template: false,
            steps: vec![step(10, 2), step(11, 1), step(12, 2), step(13, 0)],
            created_at: now,
            updated_at: now,
        };
        let ids: Vec<i64> = wf.ordered_steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![13, 11, 10, 12]);
    }
}
