use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::json;

use super::WorkflowSource;
use crate::db::Database;
use crate::error::FlowError;
use crate::models::{
    CreateWorkflowInput, Payload, StepInput, UpdateWorkflowInput, WorkflowSpec, WorkflowStep,
};

#[derive(Clone)]
pub struct WorkflowStore {
    db: Database,
}

impl WorkflowStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a workflow and its steps. Unknown agent ids are rejected.
    pub async fn create(&self, input: CreateWorkflowInput) -> Result<WorkflowSpec, FlowError> {
        if input.name.trim().is_empty() {
            return Err(FlowError::BadRequest("Workflow name must not be empty".to_string()));
        }
        self.check_agents(&input.steps).await?;

        let now = Utc::now().timestamp_millis();
        let id = self
            .db
            .with_conn_mut_async(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO workflows (name, description, category, is_template, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        input.name,
                        input.description,
                        input.category,
                        input.is_template as i64,
                        now,
                        now,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                insert_steps(&tx, id, &input.steps)?;
                tx.commit()?;
                Ok(id)
            })
            .await?;

        tracing::info!("[WorkflowStore] Created workflow {}", id);
        self.get(id)
            .await?
            .ok_or_else(|| FlowError::Internal(format!("Workflow {} vanished after insert", id)))
    }

    pub async fn get(&self, id: i64) -> Result<Option<WorkflowSpec>, FlowError> {
        self.db
            .with_conn_async(move |conn| {
                let workflow = conn
                    .query_row(
                        "SELECT id, name, description, category, is_template, created_at, updated_at
                         FROM workflows WHERE id = ?1",
                        rusqlite::params![id],
                        row_to_workflow,
                    )
                    .optional()?;
                match workflow {
                    Some(mut wf) => {
                        wf.steps = load_steps(conn, wf.id)?;
                        Ok(Some(wf))
                    }
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<WorkflowSpec>, FlowError> {
        self.list_where(false).await
    }

    pub async fn list_templates(&self) -> Result<Vec<WorkflowSpec>, FlowError> {
        self.list_where(true).await
    }

    async fn list_where(&self, templates_only: bool) -> Result<Vec<WorkflowSpec>, FlowError> {
        self.db
            .with_conn_async(move |conn| {
                let sql = if templates_only {
                    "SELECT id, name, description, category, is_template, created_at, updated_at
                     FROM workflows WHERE is_template = 1 ORDER BY id ASC"
                } else {
                    "SELECT id, name, description, category, is_template, created_at, updated_at
                     FROM workflows ORDER BY id ASC"
                };
                let mut stmt = conn.prepare(sql)?;
                let mut workflows = stmt
                    .query_map([], row_to_workflow)?
                    .collect::<Result<Vec<_>, _>>()?;
                for wf in workflows.iter_mut() {
                    wf.steps = load_steps(conn, wf.id)?;
                }
                Ok(workflows)
            })
            .await
    }

    /// Apply a partial update; `steps`, when given, replaces every step.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateWorkflowInput,
    ) -> Result<WorkflowSpec, FlowError> {
        if self.get(id).await?.is_none() {
            return Err(FlowError::NotFound(format!("Workflow {} not found", id)));
        }
        if let Some(ref steps) = input.steps {
            self.check_agents(steps).await?;
        }

        let now = Utc::now().timestamp_millis();
        self.db
            .with_conn_mut_async(move |conn| {
                let tx = conn.transaction()?;
                if let Some(ref name) = input.name {
                    tx.execute(
                        "UPDATE workflows SET name = ?1 WHERE id = ?2",
                        rusqlite::params![name, id],
                    )?;
                }
                if let Some(ref description) = input.description {
                    tx.execute(
                        "UPDATE workflows SET description = ?1 WHERE id = ?2",
                        rusqlite::params![description, id],
                    )?;
                }
                if let Some(ref category) = input.category {
                    tx.execute(
                        "UPDATE workflows SET category = ?1 WHERE id = ?2",
                        rusqlite::params![category, id],
                    )?;
                }
                if let Some(ref steps) = input.steps {
                    tx.execute(
                        "DELETE FROM workflow_steps WHERE workflow_id = ?1",
                        rusqlite::params![id],
                    )?;
                    insert_steps(&tx, id, steps)?;
                }
                tx.execute(
                    "UPDATE workflows SET updated_at = ?1 WHERE id = ?2",
                    rusqlite::params![now, id],
                )?;
                tx.commit()
            })
            .await?;

        self.get(id)
            .await?
            .ok_or_else(|| FlowError::NotFound(format!("Workflow {} not found", id)))
    }

    /// Steps go with the workflow through `ON DELETE CASCADE`.
    pub async fn delete(&self, id: i64) -> Result<bool, FlowError> {
        let removed = self
            .db
            .with_conn_async(move |conn| {
                conn.execute("DELETE FROM workflows WHERE id = ?1", rusqlite::params![id])
            })
            .await?;
        Ok(removed > 0)
    }

    /// Seed the template workflows when no templates exist yet.
    ///
    /// Requires the built-in agents to be present.
    pub async fn ensure_templates(&self) -> Result<usize, FlowError> {
        if !self.list_templates().await?.is_empty() {
            return Ok(0);
        }

        let templates = vec![
            CreateWorkflowInput {
                name: "Marketing Content Optimizer".to_string(),
                description: "Optimize marketing content for SEO and engagement".to_string(),
                category: Some("marketing".to_string()),
                is_template: true,
                steps: vec![StepInput {
                    agent_id: 1,
                    config: Payload::new(),
                    order: 1,
                }],
            },
            CreateWorkflowInput {
                name: "Meeting Productivity Suite".to_string(),
                description: "Summarize meetings and manage follow-up emails".to_string(),
                category: Some("productivity".to_string()),
                is_template: true,
                steps: vec![
                    StepInput {
                        agent_id: 2,
                        config: to_payload(json!({
                            "summary_length": "medium",
                            "extract_actions": true
                        })),
                        order: 1,
                    },
                    StepInput {
                        agent_id: 3,
                        config: to_payload(json!({
                            "mode": "draft_response",
                            "response_tone": "professional"
                        })),
                        order: 2,
                    },
                ],
            },
        ];

        let count = templates.len();
        for template in templates {
            self.create(template).await?;
        }
        tracing::info!("[WorkflowStore] Seeded {} template workflow(s)", count);
        Ok(count)
    }

    async fn check_agents(&self, steps: &[StepInput]) -> Result<(), FlowError> {
        let ids: Vec<i64> = steps.iter().map(|s| s.agent_id).collect();
        let missing = self
            .db
            .with_conn_async(move |conn| {
                let mut missing = Vec::new();
                for id in ids {
                    let exists: Option<i64> = conn
                        .query_row("SELECT id FROM agents WHERE id = ?1", rusqlite::params![id], |row| {
                            row.get(0)
                        })
                        .optional()?;
                    if exists.is_none() {
                        missing.push(id);
                    }
                }
                Ok(missing)
            })
            .await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FlowError::BadRequest(format!("Unknown agent id(s): {:?}", missing)))
        }
    }
}

#[async_trait]
impl WorkflowSource for WorkflowStore {
    async fn get_workflow(&self, id: i64) -> Result<Option<WorkflowSpec>, FlowError> {
        self.get(id).await
    }
}

fn insert_steps(conn: &Connection, workflow_id: i64, steps: &[StepInput]) -> rusqlite::Result<()> {
    for step in steps {
        conn.execute(
            "INSERT INTO workflow_steps (workflow_id, agent_id, step_order, config)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                workflow_id,
                step.agent_id,
                step.order,
                serde_json::Value::Object(step.config.clone()).to_string(),
            ],
        )?;
    }
    Ok(())
}

fn load_steps(conn: &Connection, workflow_id: i64) -> rusqlite::Result<Vec<WorkflowStep>> {
    let mut stmt = conn.prepare(
        "SELECT id, agent_id, step_order, config FROM workflow_steps
         WHERE workflow_id = ?1 ORDER BY step_order ASC, id ASC",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![workflow_id], |row| {
            let config_str: String = row.get(3).unwrap_or_default();
            Ok(WorkflowStep {
                id: row.get(0)?,
                agent_id: row.get(1)?,
                order: row.get(2)?,
                config: serde_json::from_str(&config_str).unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_workflow(row: &Row<'_>) -> rusqlite::Result<WorkflowSpec> {
    let created_ms: i64 = row.get(5).unwrap_or(0);
    let updated_ms: i64 = row.get(6).unwrap_or(0);
    let is_template: i64 = row.get(4).unwrap_or(0);

    Ok(WorkflowSpec {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2).unwrap_or_default(),
        category: row.get(3).unwrap_or(None),
        is_template: is_template != 0,
        steps: Vec::new(),
        created_at: chrono::DateTime::from_timestamp_millis(created_ms).unwrap_or_else(Utc::now),
        updated_at: chrono::DateTime::from_timestamp_millis(updated_ms).unwrap_or_else(Utc::now),
    })
}

fn to_payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Payload::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AgentStore;

    async fn stores() -> (AgentStore, WorkflowStore) {
        let db = Database::open_in_memory().unwrap();
        let agents = AgentStore::new(db.clone());
        agents.ensure_builtin().await.unwrap();
        (agents, WorkflowStore::new(db))
    }

    fn step(agent_id: i64, order: i64) -> StepInput {
        StepInput {
            agent_id,
            config: Payload::new(),
            order,
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let (_, store) = stores().await;
        let wf = store
            .create(CreateWorkflowInput {
                name: "Follow-up".to_string(),
                description: String::new(),
                category: Some("productivity".to_string()),
                is_template: false,
                steps: vec![step(3, 2), step(2, 1)],
            })
            .await
            .unwrap();
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0].agent_id, 2);

        let updated = store
            .update(
                wf.id,
                UpdateWorkflowInput {
                    name: Some("Renamed".to_string()),
                    steps: Some(vec![step(4, 1)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.steps.len(), 1);
        assert_eq!(updated.steps[0].agent_id, 4);
        assert_eq!(updated.category.as_deref(), Some("productivity"));

        assert!(store.delete(wf.id).await.unwrap());
        assert!(store.get(wf.id).await.unwrap().is_none());
        assert!(!store.delete(wf.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades_steps() {
        let db = Database::open_in_memory().unwrap();
        AgentStore::new(db.clone()).ensure_builtin().await.unwrap();
        let store = WorkflowStore::new(db.clone());
        let wf = store
            .create(CreateWorkflowInput {
                name: "Cleanup".to_string(),
                description: String::new(),
                category: None,
                is_template: false,
                steps: vec![step(2, 1), step(3, 2)],
            })
            .await
            .unwrap();

        let count_steps = |db: Database, id: i64| async move {
            db.with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM workflow_steps WHERE workflow_id = ?1",
                    rusqlite::params![id],
                    |row| row.get::<_, i64>(0),
                )
            })
            .await
            .unwrap()
        };
        assert_eq!(count_steps(db.clone(), wf.id).await, 2);
        assert!(store.delete(wf.id).await.unwrap());
        assert_eq!(count_steps(db, wf.id).await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_agent() {
        let (_, store) = stores().await;
        let err = store
            .create(CreateWorkflowInput {
                name: "Broken".to_string(),
                description: String::new(),
                category: None,
                is_template: false,
                steps: vec![step(99, 1)],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_missing_workflow() {
        let (_, store) = stores().await;
        let err = store.update(42, UpdateWorkflowInput::default()).await.unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ensure_templates() {
        let (_, store) = stores().await;
        assert_eq!(store.ensure_templates().await.unwrap(), 2);
        assert_eq!(store.ensure_templates().await.unwrap(), 0);

        let templates = store.list_templates().await.unwrap();
        let suite = templates
            .iter()
            .find(|w| w.name == "Meeting Productivity Suite")
            .unwrap();
        assert_eq!(suite.steps.len(), 2);
        assert_eq!(suite.steps[1].config["mode"], "draft_response");
        assert_eq!(suite.category.as_deref(), Some("productivity"));
    }
}
