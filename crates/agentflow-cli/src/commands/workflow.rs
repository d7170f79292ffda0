//! `agentflow workflow`: run, validate and manage workflows.

use std::path::Path;

use agentflow_core::models::{ExecutionResult, UploadedFile, WorkflowInput};
use agentflow_core::state::AppState;
use agentflow_core::store::AgentCatalog;
use agentflow_core::workflow::{InputAdapter, WorkflowDefinition};

use super::{build_input, print_json};

/// Resolve a YAML definition and run it without storing it.
pub async fn run_definition(
    state: &AppState,
    definition: &WorkflowDefinition,
    input: &WorkflowInput,
    file: Option<&UploadedFile>,
    prompt: Option<&str>,
) -> Result<ExecutionResult, String> {
    let spec = definition
        .resolve(&state.agent_store)
        .await
        .map_err(|e| e.to_string())?;

    let first_agent_id = spec
        .ordered_steps()
        .first()
        .map(|s| s.agent_id)
        .ok_or_else(|| format!("Workflow '{}' has no steps", spec.name))?;
    let first_agent = state
        .agent_store
        .get_agent(first_agent_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Agent {} not found", first_agent_id))?;

    let initial = InputAdapter::adapt(input, &first_agent, file);
    let user_prompt = prompt.unwrap_or(&input.content);
    state
        .engine
        .run(&spec, initial, user_prompt)
        .await
        .map_err(|e| e.to_string())
}

pub async fn run(
    state: &AppState,
    workflow_file: &str,
    content: Option<&str>,
    input_file: Option<&str>,
    vars: &[String],
    prompt: Option<&str>,
) -> Result<(), String> {
    let definition =
        WorkflowDefinition::from_file(Path::new(workflow_file)).map_err(|e| e.to_string())?;
    tracing::info!(
        "Loaded workflow '{}' ({} step(s)) from {}",
        definition.name,
        definition.steps.len(),
        workflow_file
    );

    let (input, file) = build_input(content, input_file, vars)?;
    let result = run_definition(state, &definition, &input, file.as_ref(), prompt).await?;
    report(&result)
}

/// Print a run result; step errors are warnings, not failures.
pub(crate) fn report(result: &ExecutionResult) -> Result<(), String> {
    print_json(result)?;
    if result.context.has_errors() {
        eprintln!(
            "Warning: {} step error(s) recorded during the run",
            result.context.errors.len()
        );
    }
    Ok(())
}

/// Validate a workflow YAML file against the agent catalog without running it.
pub async fn validate(state: &AppState, workflow_file: &str) -> Result<(), String> {
    let definition =
        WorkflowDefinition::from_file(Path::new(workflow_file)).map_err(|e| e.to_string())?;
    let spec = definition
        .resolve(&state.agent_store)
        .await
        .map_err(|e| e.to_string())?;

    println!("Workflow '{}' is valid", spec.name);
    if let Some(ref category) = spec.category {
        println!("   Category: {}", category);
    }
    println!("   Steps: {}", spec.steps.len());
    for (i, step) in spec.ordered_steps().iter().enumerate() {
        let name = state
            .agent_store
            .get_agent(step.agent_id)
            .await
            .map_err(|e| e.to_string())?
            .map(|a| a.name)
            .unwrap_or_default();
        println!("   {}. {} (agent {}, order {})", i + 1, name, step.agent_id, step.order);
    }
    Ok(())
}

pub async fn list(state: &AppState, templates_only: bool) -> Result<(), String> {
    let workflows = if templates_only {
        state.workflow_store.list_templates().await
    } else {
        state.workflow_store.list().await
    }
    .map_err(|e| e.to_string())?;
    print_json(&workflows)
}

pub async fn show(state: &AppState, id: i64) -> Result<(), String> {
    let workflow = state
        .workflow_store
        .get(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Workflow {} not found", id))?;
    print_json(&workflow)
}

/// Store a YAML definition; returns the new workflow id.
pub async fn create(state: &AppState, workflow_file: &str) -> Result<i64, String> {
    let definition =
        WorkflowDefinition::from_file(Path::new(workflow_file)).map_err(|e| e.to_string())?;
    let input = definition
        .to_create_input(&state.agent_store)
        .await
        .map_err(|e| e.to_string())?;
    let workflow = state
        .workflow_store
        .create(input)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&workflow)?;
    Ok(workflow.id)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), String> {
    let removed = state
        .workflow_store
        .delete(id)
        .await
        .map_err(|e| e.to_string())?;
    if !removed {
        return Err(format!("Workflow {} not found", id));
    }
    println!("Deleted workflow {}", id);
    Ok(())
}
