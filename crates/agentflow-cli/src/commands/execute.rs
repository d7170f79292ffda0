//! `agentflow execute`: run a stored workflow by id.

use agentflow_core::state::AppState;

use super::build_input;
use super::workflow::report;

pub async fn execute(
    state: &AppState,
    workflow_id: i64,
    content: Option<&str>,
    input_file: Option<&str>,
    vars: &[String],
) -> Result<(), String> {
    let (input, file) = build_input(content, input_file, vars)?;
    let result = state
        .engine
        .execute(workflow_id, &input, file.as_ref())
        .await
        .map_err(|e| e.to_string())?;
    report(&result)
}
