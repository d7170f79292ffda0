//! Shared application state: database, stores and the workflow engine.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::FlowError;
use crate::knowledge::{InMemoryKnowledgeStore, KnowledgeRegistry, KnowledgeStore};
use crate::llm::{build_client, LlmClient};
use crate::store::{AgentStore, WorkflowStore};
use crate::workflow::{AgentRegistry, AgentServices, WorkflowEngine};

const SCHEDULER_TIMEOUT_SECS: u64 = 30;

pub struct AppStateInner {
    pub db: Database,
    pub config: AppConfig,
    pub agent_store: AgentStore,
    pub workflow_store: WorkflowStore,
    pub engine: WorkflowEngine,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Wire up the LLM client named by `config` and an in-memory knowledge store.
    pub fn new(db: Database, config: AppConfig) -> Result<Self, FlowError> {
        let llm = build_client(&config.llm).map_err(|e| FlowError::Config(e.to_string()))?;
        Self::with_services(db, config, llm, Arc::new(InMemoryKnowledgeStore::new()))
    }

    pub fn with_services(
        db: Database,
        config: AppConfig,
        llm: Arc<dyn LlmClient>,
        knowledge: Arc<dyn KnowledgeStore>,
    ) -> Result<Self, FlowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SCHEDULER_TIMEOUT_SECS))
            .build()
            .map_err(|e| FlowError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let agent_store = AgentStore::new(db.clone());
        let workflow_store = WorkflowStore::new(db.clone());
        let registry = AgentRegistry::new(AgentServices {
            llm,
            knowledge: knowledge.clone(),
            scheduler: config.scheduler.clone(),
            http,
        });
        let engine = WorkflowEngine::new(
            registry,
            KnowledgeRegistry::new(knowledge),
            Arc::new(agent_store.clone()),
            Arc::new(workflow_store.clone()),
        );

        Ok(Self {
            db,
            config,
            agent_store,
            workflow_store,
            engine,
        })
    }

    /// Seed built-in agents and template workflows.
    pub async fn seed(&self) -> Result<(), FlowError> {
        self.agent_store.ensure_builtin().await?;
        self.workflow_store.ensure_templates().await?;
        Ok(())
    }
}
