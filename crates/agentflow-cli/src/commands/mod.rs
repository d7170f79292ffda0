//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and drives the
//! agentflow-core engine and stores through `AppState`.

pub mod agent;
pub mod execute;
pub mod workflow;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use agentflow_core::models::{UploadedFile, WorkflowInput};
use agentflow_core::state::{AppState, AppStateInner};
use agentflow_core::AppConfig;

/// Load configuration: a YAML file when given, the environment otherwise.
/// An explicit `db_path` wins over both.
pub fn load_config(db_path: Option<&str>, config_file: Option<&str>) -> Result<AppConfig, String> {
    let mut config = match config_file {
        Some(path) => AppConfig::from_file(Path::new(path)).map_err(|e| e.to_string())?,
        None => AppConfig::from_env(),
    };
    if let Some(db) = db_path {
        config.db_path = db.to_string();
    }
    Ok(config)
}

/// Open the database, wire up the engine and seed the built-in catalog.
pub async fn init_state(db_path: Option<&str>, config_file: Option<&str>) -> AppState {
    let config = load_config(db_path, config_file).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    let db = agentflow_core::Database::open(&config.db_path).unwrap_or_else(|e| {
        eprintln!("Failed to open database '{}': {}", config.db_path, e);
        std::process::exit(1);
    });

    let state = AppStateInner::new(db, config).unwrap_or_else(|e| {
        eprintln!("Failed to initialize: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = state.seed().await {
        eprintln!("Failed to seed built-in agents: {}", e);
        std::process::exit(1);
    }

    Arc::new(state)
}

/// Parse repeated `--var key=value` arguments.
pub fn parse_vars(vars: &[String]) -> Result<BTreeMap<String, String>, String> {
    vars.iter()
        .map(|raw| match raw.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => Err(format!("Invalid variable '{}', expected key=value", raw)),
        })
        .collect()
}

/// Build the workflow envelope from command-line inputs.
pub fn build_input(
    content: Option<&str>,
    file: Option<&str>,
    vars: &[String],
) -> Result<(WorkflowInput, Option<UploadedFile>), String> {
    let input = WorkflowInput {
        content: content.unwrap_or_default().to_string(),
        variables: parse_vars(vars)?,
        ..Default::default()
    };
    let upload = match file {
        Some(path) => Some(
            UploadedFile::from_path(Path::new(path))
                .map_err(|e| format!("Failed to read '{}': {}", path, e))?,
        ),
        None => None,
    };
    Ok((input, upload))
}

/// Pretty-print a serializable value to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}
