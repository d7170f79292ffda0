use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use serde_json::json;

use super::AgentCatalog;
use crate::db::Database;
use crate::error::FlowError;
use crate::models::{AgentKind, AgentSpec};
use crate::schema::{PropertySpec, SchemaSpec, SchemaType};

#[derive(Clone)]
pub struct AgentStore {
    db: Database,
}

const AGENT_COLUMNS: &str =
    "id, name, description, category, kind, input_schema, output_schema, config_schema, created_at";

impl AgentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn save(&self, agent: &AgentSpec) -> Result<(), FlowError> {
        let a = agent.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO agents (id, name, description, category, kind, input_schema, output_schema, config_schema, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       description = excluded.description,
                       category = excluded.category,
                       kind = excluded.kind,
                       input_schema = excluded.input_schema,
                       output_schema = excluded.output_schema,
                       config_schema = excluded.config_schema",
                    rusqlite::params![
                        a.id,
                        a.name,
                        a.description,
                        a.category,
                        a.kind.as_str(),
                        a.input_schema.to_value().to_string(),
                        a.output_schema.to_value().to_string(),
                        a.config_schema.to_value().to_string(),
                        a.created_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<AgentSpec>, FlowError> {
        self.db
            .with_conn_async(move |conn| {
                let sql = format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_row(rusqlite::params![id], row_to_agent).optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<AgentSpec>, FlowError> {
        self.db
            .with_conn_async(move |conn| {
                let sql = format!("SELECT {} FROM agents ORDER BY id ASC", AGENT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], row_to_agent)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<AgentSpec>, FlowError> {
        let category = category.to_string();
        self.db
            .with_conn_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM agents WHERE category = ?1 ORDER BY id ASC",
                    AGENT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params![category], row_to_agent)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), FlowError> {
        self.db
            .with_conn_async(move |conn| {
                conn.execute("DELETE FROM agents WHERE id = ?1", rusqlite::params![id])?;
                Ok(())
            })
            .await
    }

    /// Seed the built-in agents if they are missing. Returns how many were added.
    pub async fn ensure_builtin(&self) -> Result<usize, FlowError> {
        let mut added = 0;
        for agent in builtin_agents() {
            if self.get(agent.id).await?.is_none() {
                self.save(&agent).await?;
                added += 1;
            }
        }
        if added > 0 {
            tracing::info!("[AgentStore] Seeded {} built-in agent(s)", added);
        }
        Ok(added)
    }
}

#[async_trait]
impl AgentCatalog for AgentStore {
    async fn get_agent(&self, id: i64) -> Result<Option<AgentSpec>, FlowError> {
        self.get(id).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentSpec>, FlowError> {
        self.list().await
    }
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<AgentSpec> {
    let kind_str: String = row.get(4)?;
    let kind = AgentKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown agent kind '{}'", kind_str).into(),
        )
    })?;
    let created_ms: i64 = row.get(8).unwrap_or(0);

    Ok(AgentSpec {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2).unwrap_or_default(),
        category: row.get(3).unwrap_or_default(),
        kind,
        input_schema: parse_schema(row, 5),
        output_schema: parse_schema(row, 6),
        config_schema: parse_schema(row, 7),
        created_at: chrono::DateTime::from_timestamp_millis(created_ms).unwrap_or_else(Utc::now),
    })
}

fn parse_schema(row: &Row<'_>, idx: usize) -> SchemaSpec {
    let raw: String = row.get(idx).unwrap_or_default();
    serde_json::from_str(&raw).unwrap_or_default()
}

/// Built-in catalog records, ids 1 through 5.
///
/// The catalog schemas are the advertised contracts used by the input
/// adapter; each agent's own declared schema drives step validation.
pub fn builtin_agents() -> Vec<AgentSpec> {
    let now = Utc::now();
    let string = || PropertySpec::of(SchemaType::String);

    vec![
        AgentSpec {
            id: 1,
            name: AgentKind::SeoOptimizer.display_name().to_string(),
            description: "Analyzes content and provides SEO recommendations".to_string(),
            category: "marketing".to_string(),
            kind: AgentKind::SeoOptimizer,
            input_schema: SchemaSpec::object()
                .property("content", string())
                .property(
                    "keywords",
                    PropertySpec::of(SchemaType::Array).with_items(string()),
                )
                .require("content"),
            output_schema: SchemaSpec::object()
                .property("keyword_analysis", PropertySpec::of(SchemaType::Object))
                .property(
                    "recommendations",
                    PropertySpec::of(SchemaType::Array).with_items(string()),
                )
                .property("seo_score", PropertySpec::of(SchemaType::Number)),
            config_schema: SchemaSpec::object().property("collection_name", string()),
            created_at: now,
        },
        AgentSpec {
            id: 2,
            name: AgentKind::MeetingSummarizer.display_name().to_string(),
            description: "Summarizes meeting transcripts and extracts action items".to_string(),
            category: "productivity".to_string(),
            kind: AgentKind::MeetingSummarizer,
            input_schema: SchemaSpec::object()
                .property("transcript", string())
                .require("transcript"),
            output_schema: SchemaSpec::object()
                .property("summary", string())
                .property("action_items", PropertySpec::of(SchemaType::Array))
                .property("participants", PropertySpec::of(SchemaType::Array))
                .property("duration_minutes", PropertySpec::of(SchemaType::Integer)),
            config_schema: SchemaSpec::object()
                .property(
                    "summary_length",
                    string().with_enum(&["short", "medium", "long"]),
                )
                .property("extract_actions", PropertySpec::of(SchemaType::Boolean)),
            created_at: now,
        },
        AgentSpec {
            id: 3,
            name: AgentKind::EmailManager.display_name().to_string(),
            description: "Categorizes, prioritizes, and drafts responses to emails".to_string(),
            category: "productivity".to_string(),
            kind: AgentKind::EmailManager,
            input_schema: SchemaSpec::object()
                .property("email", PropertySpec::of(SchemaType::Object))
                .require("email"),
            output_schema: SchemaSpec::object(),
            config_schema: SchemaSpec::object()
                .property(
                    "mode",
                    string().with_enum(&["categorize", "prioritize", "draft_response"]),
                )
                .property(
                    "response_tone",
                    string().with_enum(&["professional", "friendly", "concise"]),
                ),
            created_at: now,
        },
        AgentSpec {
            id: 4,
            name: AgentKind::GrammarChecker.display_name().to_string(),
            description: "Checks and corrects grammar/style errors and provides writing suggestions"
                .to_string(),
            category: "content".to_string(),
            kind: AgentKind::GrammarChecker,
            input_schema: SchemaSpec::object()
                .property(
                    "content",
                    string().describe("The text content to be checked and corrected."),
                )
                .property("transcript", string())
                .property("summary", string())
                .property("email", PropertySpec::of(SchemaType::Object)),
            output_schema: SchemaSpec::object()
                .property(
                    "corrected_text",
                    string().describe("The text with grammar and style corrections applied."),
                )
                .property(
                    "suggestions",
                    string().describe("Specific suggestions for further improvement."),
                )
                .property(
                    "original_text",
                    string().describe("The original, uncorrected text (for comparison)."),
                ),
            config_schema: SchemaSpec::object().property(
                "model_name",
                string()
                    .describe("The name of the model to use.")
                    .with_default(json!("gemini-2.0-flash")),
            ),
            created_at: now,
        },
        AgentSpec {
            id: 5,
            name: AgentKind::MeetingScheduler.display_name().to_string(),
            description: "Schedules meetings through the Zoom API".to_string(),
            category: "productivity".to_string(),
            kind: AgentKind::MeetingScheduler,
            input_schema: SchemaSpec::object()
                .property("meeting_topic", string())
                .property("meeting_start_time", string().with_format("date-time"))
                .property("meeting_duration", PropertySpec::of(SchemaType::Integer))
                .property("timezone", string()),
            output_schema: SchemaSpec::object()
                .property("meeting_info", PropertySpec::of(SchemaType::Object))
                .property("error", string()),
            config_schema: SchemaSpec::object()
                .property("user_id", string().describe("User id of the Zoom account")),
            created_at: now,
        },
    ]
}
