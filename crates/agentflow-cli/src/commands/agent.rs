//! `agentflow agent`: inspect the catalog and preview single agents.

use serde_json::json;

use agentflow_core::models::Payload;
use agentflow_core::state::AppState;

use super::{build_input, print_json};

pub async fn list(state: &AppState) -> Result<(), String> {
    let agents = state.agent_store.list().await.map_err(|e| e.to_string())?;
    let rows: Vec<_> = agents
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "name": a.name,
                "kind": a.kind.as_str(),
                "category": a.category,
                "description": a.description,
            })
        })
        .collect();
    print_json(&rows)
}

/// Run one agent on an adapted envelope. `config` is a JSON object string.
pub async fn preview(
    state: &AppState,
    agent_id: i64,
    content: Option<&str>,
    input_file: Option<&str>,
    vars: &[String],
    config: Option<&str>,
) -> Result<(), String> {
    let config: Payload = match config {
        Some(raw) => serde_json::from_str(raw).map_err(|e| format!("Invalid --config-json: {}", e))?,
        None => Payload::new(),
    };
    let (input, file) = build_input(content, input_file, vars)?;
    let preview = state
        .engine
        .preview_agent(agent_id, &input, file.as_ref(), &config)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&preview)?;
    match preview.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
