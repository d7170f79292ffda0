//! Workflow Engine: runs an ordered agent chain over one shared context.
//!
//! Per step:
//! 1. Validate the current input against the agent's declared input schema
//! 2. On violation, record the error and repair the input to the schema
//! 3. Invoke the agent and fold its output, knowledge and side effects
//!    into the context
//! 4. Hand the output to the next step unchanged
//!
//! A failing step never aborts the run: its error is recorded and the next
//! step receives `{error, agent_id}` instead. Only catalog lookups and agent
//! construction return `Err`.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::agents::Agent;
use crate::error::FlowError;
use crate::knowledge::KnowledgeRegistry;
use crate::models::{
    Adaptation, AgentSpec, ExecutionContext, ExecutionResult, KnowledgeItem, Payload,
    PreviewResult, StepError, UploadedFile, WorkflowInput, WorkflowSpec,
};
use crate::store::{AgentCatalog, WorkflowSource};
use crate::workflow::adapter::InputAdapter;
use crate::workflow::registry::AgentRegistry;

const AD_HOC_WORKFLOW_NAME: &str = "Test Workflow";

/// A step resolved against the catalog, ready to run.
struct PlannedStep {
    key: String,
    agent: AgentSpec,
    config: Payload,
}

pub struct WorkflowEngine {
    registry: AgentRegistry,
    knowledge: KnowledgeRegistry,
    catalog: Arc<dyn AgentCatalog>,
    source: Arc<dyn WorkflowSource>,
}

impl WorkflowEngine {
    pub fn new(
        registry: AgentRegistry,
        knowledge: KnowledgeRegistry,
        catalog: Arc<dyn AgentCatalog>,
        source: Arc<dyn WorkflowSource>,
    ) -> Self {
        Self {
            registry,
            knowledge,
            catalog,
            source,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Load a stored workflow, adapt the envelope for its first step and run it.
    pub async fn execute(
        &self,
        workflow_id: i64,
        input: &WorkflowInput,
        file: Option<&UploadedFile>,
    ) -> Result<ExecutionResult, FlowError> {
        let workflow = self
            .source
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| FlowError::NotFound(format!("Workflow with ID {} not found", workflow_id)))?;

        let first = workflow
            .ordered_steps()
            .first()
            .map(|s| s.agent_id)
            .ok_or_else(|| {
                FlowError::BadRequest(format!("Workflow {} has no steps", workflow_id))
            })?;
        let first_agent = self.agent(first).await?;

        let initial_input = InputAdapter::adapt(input, &first_agent, file);
        self.run(&workflow, initial_input, &input.content).await
    }

    /// Run a workflow on an already-shaped input.
    pub async fn run(
        &self,
        workflow: &WorkflowSpec,
        initial_input: Payload,
        user_prompt: &str,
    ) -> Result<ExecutionResult, FlowError> {
        if workflow.steps.is_empty() {
            return Err(FlowError::BadRequest(format!(
                "Workflow {} has no steps",
                workflow.id
            )));
        }

        let mut steps = Vec::with_capacity(workflow.steps.len());
        for step in workflow.ordered_steps() {
            steps.push(PlannedStep {
                key: step.id.to_string(),
                agent: self.agent(step.agent_id).await?,
                config: step.config.clone(),
            });
        }

        let mut context = ExecutionContext::new(
            Some(workflow.id),
            &workflow.name,
            initial_input.clone(),
            user_prompt,
        );
        context.rag_context.shared_collections = self.knowledge.shared_collections();
        if let Some(ref category) = workflow.category {
            context.rag_context.domain_collections = self.knowledge.domain_collections(category);
        }

        tracing::info!(
            "[WorkflowEngine] Running '{}' ({} step(s))",
            workflow.name,
            steps.len()
        );
        self.run_steps(context, steps, initial_input).await
    }

    /// Run unsaved `(agent, config, order)` steps; results are keyed `step_<i>`.
    pub async fn execute_steps(
        &self,
        steps: &[(AgentSpec, Payload, i64)],
        initial_input: Payload,
        user_prompt: &str,
    ) -> Result<ExecutionResult, FlowError> {
        let mut ordered: Vec<&(AgentSpec, Payload, i64)> = steps.iter().collect();
        ordered.sort_by_key(|(_, _, order)| *order);

        let planned = ordered
            .into_iter()
            .enumerate()
            .map(|(i, (agent, config, _))| PlannedStep {
                key: format!("step_{}", i),
                agent: agent.clone(),
                config: config.clone(),
            })
            .collect();

        let mut context =
            ExecutionContext::new(None, AD_HOC_WORKFLOW_NAME, initial_input.clone(), user_prompt);
        context.rag_context.shared_collections = self.knowledge.shared_collections();
        self.run_steps(context, planned, initial_input).await
    }

    /// Adapt the envelope for a single agent and run it once.
    ///
    /// Agent failures are reported in the result rather than as `Err`.
    pub async fn preview_agent(
        &self,
        agent_id: i64,
        input: &WorkflowInput,
        file: Option<&UploadedFile>,
        config: &Payload,
    ) -> Result<PreviewResult, FlowError> {
        let spec = self.agent(agent_id).await?;
        let adapted = InputAdapter::adapt(input, &spec, file);
        let mut agent = self.registry.instantiate(&spec, config)?;

        let context = ExecutionContext::new(None, "Preview", adapted.clone(), &input.content);
        let (status, output, error) = match agent.process(adapted.clone(), Some(&context)).await {
            Ok(output) => ("success", Some(output), None),
            Err(e) => {
                tracing::warn!("[WorkflowEngine] Preview of '{}' failed: {}", spec.name, e);
                ("error", None, Some(format!("Error previewing agent output: {}", e)))
            }
        };

        Ok(PreviewResult {
            status: status.to_string(),
            agent_id,
            agent_name: spec.name,
            input: adapted,
            output,
            error,
        })
    }

    async fn agent(&self, agent_id: i64) -> Result<AgentSpec, FlowError> {
        self.catalog
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| FlowError::NotFound(format!("Agent with id {} not found", agent_id)))
    }

    async fn run_steps(
        &self,
        mut context: ExecutionContext,
        steps: Vec<PlannedStep>,
        initial_input: Payload,
    ) -> Result<ExecutionResult, FlowError> {
        let mut current = initial_input;

        for (i, step) in steps.into_iter().enumerate() {
            let spec = &step.agent;
            let mut agent = self.registry.instantiate(spec, &step.config)?;
            tracing::info!("[WorkflowEngine] Step {}: {}", i, spec.name);

            current = self.prepare_input(&mut context, i, spec, agent.as_ref(), current);

            let step_input = std::mem::take(&mut current);
            match agent.process(step_input, Some(&context)).await {
                Ok(output) => {
                    context
                        .intermediate_results
                        .insert(step.key.clone(), Value::Object(output.clone()));

                    let knowledge = agent.published_knowledge();
                    if !knowledge.is_empty() {
                        self.store_knowledge(&knowledge).await;
                        context
                            .rag_context
                            .generated_knowledge
                            .insert(spec.name.clone(), knowledge);
                    }
                    current = output;
                }
                Err(e) => {
                    let message = format!("Agent processing failed: {}", e);
                    tracing::warn!("[WorkflowEngine] Step {} ({}): {}", i, spec.name, message);
                    context.errors.push(StepError {
                        step: i,
                        agent_id: spec.id,
                        agent_name: spec.name.clone(),
                        error: message.clone(),
                        input: None,
                    });
                    current = crate::agents::into_payload(json!({
                        "error": message,
                        "agent_id": spec.id,
                    }));
                }
            }

            if let Some(mut effect) = agent.side_effect() {
                effect.step = i;
                effect.agent_id = spec.id;
                context.side_effects.push(effect);
            }
        }

        if context.has_errors() {
            tracing::warn!(
                "[WorkflowEngine] '{}' finished with {} error(s)",
                context.workflow_name,
                context.errors.len()
            );
        } else {
            tracing::info!("[WorkflowEngine] '{}' finished", context.workflow_name);
        }

        Ok(ExecutionResult {
            final_output: current,
            context,
        })
    }

    /// Validate against the agent's own schema, repairing on violation.
    fn prepare_input(
        &self,
        context: &mut ExecutionContext,
        step: usize,
        spec: &AgentSpec,
        agent: &dyn Agent,
        input: Payload,
    ) -> Payload {
        let schema = agent.input_schema();
        let violation = match schema.validate(&input) {
            Ok(()) => return input,
            Err(v) => v,
        };

        context.errors.push(StepError {
            step,
            agent_id: spec.id,
            agent_name: spec.name.clone(),
            error: format!("Input validation failed: {}", violation),
            input: Some(input.clone()),
        });

        match schema.repair(&input) {
            Ok(repaired) => {
                context.adaptations.push(Adaptation {
                    step,
                    agent_id: spec.id,
                    agent_name: spec.name.clone(),
                    message: "Input was adapted to match expected schema".to_string(),
                });
                repaired
            }
            Err(e) => {
                context.errors.push(StepError {
                    step,
                    agent_id: spec.id,
                    agent_name: spec.name.clone(),
                    error: format!("Input adaptation failed: {}", e),
                    input: None,
                });
                input
            }
        }
    }

    async fn store_knowledge(&self, items: &[KnowledgeItem]) {
        let store = self.knowledge.store();
        for item in items {
            store
                .add_documents(
                    &item.collection,
                    vec![item.document.clone()],
                    vec![item.metadata.clone()],
                    Some(vec![uuid::Uuid::new_v4().to_string()]),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    use crate::config::SchedulerConfig;
    use crate::knowledge::InMemoryKnowledgeStore;
    use crate::llm::MockLlmClient;
    use crate::models::{AgentKind, WorkflowStep};
    use crate::store::builtin_agents;
    use crate::workflow::registry::AgentServices;

    struct StaticCatalog(Vec<AgentSpec>);

    #[async_trait]
    impl AgentCatalog for StaticCatalog {
        async fn get_agent(&self, id: i64) -> Result<Option<AgentSpec>, FlowError> {
            Ok(self.0.iter().find(|a| a.id == id).cloned())
        }

        async fn list_agents(&self) -> Result<Vec<AgentSpec>, FlowError> {
            Ok(self.0.clone())
        }
    }

    struct StaticSource(Vec<WorkflowSpec>);

    #[async_trait]
    impl WorkflowSource for StaticSource {
        async fn get_workflow(&self, id: i64) -> Result<Option<WorkflowSpec>, FlowError> {
            Ok(self.0.iter().find(|w| w.id == id).cloned())
        }
    }

    fn workflow(id: i64, category: Option<&str>, steps: Vec<(i64, Value)>) -> WorkflowSpec {
        let now = Utc::now();
        WorkflowSpec {
            id,
            name: format!("wf-{}", id),
            description: String::new(),
            category: category.map(str::to_string),
            is_template: false,
            steps: steps
                .into_iter()
                .enumerate()
                .map(|(i, (agent_id, config))| WorkflowStep {
                    id: 100 + i as i64,
                    agent_id,
                    config: crate::agents::into_payload(config),
                    order: i as i64,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    fn engine(llm: MockLlmClient, workflows: Vec<WorkflowSpec>) -> WorkflowEngine {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let registry = AgentRegistry::new(AgentServices {
            llm: Arc::new(llm),
            knowledge: store.clone(),
            scheduler: SchedulerConfig {
                api_key: None,
                api_secret: None,
                base_url: "http://127.0.0.1:9".to_string(),
                user_id: "me".to_string(),
            },
            http: reqwest::Client::new(),
        });
        WorkflowEngine::new(
            registry,
            KnowledgeRegistry::new(store),
            Arc::new(StaticCatalog(builtin_agents())),
            Arc::new(StaticSource(workflows)),
        )
    }

    #[tokio::test]
    async fn test_single_categorize_step_is_clean() {
        let wf = workflow(1, Some("productivity"), vec![(3, json!({ "mode": "categorize" }))]);
        let engine = engine(MockLlmClient::unavailable(), vec![wf]);

        let input = WorkflowInput::from_content("Please send the invoice for the renewal.")
            .with_variable("subject", "Invoice question");
        let result = engine.execute(1, &input, None).await.unwrap();

        assert_eq!(result.context.intermediate_results.len(), 1);
        assert!(result.context.intermediate_results.contains_key("100"));
        assert!(!result.context.has_errors());
        assert!(result.final_output.contains_key("categories"));
        assert_eq!(
            result.context.rag_context.domain_collections,
            vec!["meeting_knowledge".to_string(), "productivity_tips".to_string()]
        );
        assert_eq!(result.context.rag_context.shared_collections.len(), 7);
    }

    #[tokio::test]
    async fn test_unknown_workflow_and_empty_workflow() {
        let engine = engine(MockLlmClient::unavailable(), vec![workflow(2, None, vec![])]);
        let input = WorkflowInput::from_content("x");

        assert!(matches!(
            engine.execute(9, &input, None).await,
            Err(FlowError::NotFound(_))
        ));
        assert!(matches!(
            engine.execute(2, &input, None).await,
            Err(FlowError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_failure_is_repaired_and_recorded() {
        let engine = engine(MockLlmClient::new("Fine."), vec![]);
        let checker = builtin_agents().remove(3);

        let mut input = Payload::new();
        input.insert("content".into(), json!(42));
        input.insert("stray".into(), json!("dropped by repair"));
        let result = engine
            .execute_steps(&[(checker, Payload::new(), 0)], input, "")
            .await
            .unwrap();

        let errors = &result.context.errors;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].error.starts_with("Input validation failed: "));
        assert_eq!(errors[0].input.as_ref().unwrap()["content"], 42);
        assert_eq!(result.context.adaptations.len(), 1);
        assert_eq!(
            result.context.adaptations[0].message,
            "Input was adapted to match expected schema"
        );
        // The repaired input held no usable text.
        assert_eq!(
            result.final_output["error"],
            "No content provided for grammar checking"
        );
        assert!(result.context.intermediate_results.contains_key("step_0"));
        assert_eq!(result.context.workflow_name, "Test Workflow");
        assert!(result.context.workflow_id.is_none());
    }

    #[tokio::test]
    async fn test_scheduler_construction_failure_is_fatal() {
        let wf = workflow(4, None, vec![(5, json!({}))]);
        let engine = engine(MockLlmClient::unavailable(), vec![wf]);
        let result = engine.execute(4, &WorkflowInput::from_content("standup"), None).await;
        assert!(matches!(result, Err(FlowError::Config(_))));
    }

    #[tokio::test]
    async fn test_published_knowledge_reaches_context_and_store() {
        let llm = MockLlmClient::new("The team planned the launch.")
            .with_reply("names of participants", "[\"Alice\", \"Bob\"]")
            .with_reply("estimates the duration", "20");
        let wf = workflow(5, Some("productivity"), vec![(2, json!({}))]);
        let engine = engine(llm, vec![wf]);

        let input = WorkflowInput::from_content("Alice: Let's plan the launch.\nBob: Agreed.");
        let result = engine.execute(5, &input, None).await.unwrap();

        let generated = &result.context.rag_context.generated_knowledge;
        let items = generated.get("Meeting Summarizer").unwrap();
        assert!(!items.is_empty());
        let store = engine.knowledge.store();
        assert!(store.collection_len(&items[0].collection).await >= 1);
        assert_eq!(result.context.user_prompt, input.content);
    }

    #[tokio::test]
    async fn test_preview_reports_adapted_input() {
        let engine = engine(MockLlmClient::new("Looks fine."), vec![]);
        let preview = engine
            .preview_agent(4, &WorkflowInput::from_content("Helo world"), None, &Payload::new())
            .await
            .unwrap();

        assert_eq!(preview.status, "success");
        assert_eq!(preview.agent_name, "Grammar and Style Checker");
        assert_eq!(preview.input["content"], "Helo world");
        assert_eq!(preview.output.unwrap()["suggestions"], "Looks fine.");

        assert!(matches!(
            engine
                .preview_agent(42, &WorkflowInput::default(), None, &Payload::new())
                .await,
            Err(FlowError::NotFound(_))
        ));
    }

    #[test]
    fn test_kind_of_builtin_template_agents() {
        let agents = builtin_agents();
        assert_eq!(agents[1].kind, AgentKind::MeetingSummarizer);
        assert_eq!(agents[2].kind, AgentKind::EmailManager);
    }
}
