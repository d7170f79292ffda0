//! Runtime configuration.
//!
//! Values come from the environment first (the CLI loads `.env.local` and
//! `.env` before this runs), then an optional YAML file overrides them:
//!
//! ```yaml
//! db_path: "~/.agentflow/agentflow.db"
//! llm:
//!   provider: anthropic
//!   model: "claude-3-5-haiku-latest"
//!   api_key: "${ANTHROPIC_API_KEY}"
//! scheduler:
//!   base_url: "${ZOOM_API_BASE_URL:-https://api.zoom.us/v2}"
//! ```
//!
//! String values in the file support `${VAR}` and `${VAR:-default}`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Which LLM backend agents talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    /// Offline: every call fails, so agents take their deterministic paths.
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "openai-compatible" => Some(Self::OpenAi),
            "mock" | "offline" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Connection settings for the LLM capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Defaults for a provider, filled from its conventional env vars.
    pub fn for_provider(provider: LlmProvider) -> Self {
        let (base_url, api_key, model) = match provider {
            LlmProvider::Gemini => (
                env_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com/v1beta"),
                first_env(&["GOOGLE_API_KEY", "GEMINI_API_KEY"]),
                env_or("GEMINI_MODEL", "gemini-2.0-flash"),
            ),
            LlmProvider::Anthropic => (
                env_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
                first_env(&["ANTHROPIC_AUTH_TOKEN", "ANTHROPIC_API_KEY"]),
                env_or("ANTHROPIC_MODEL", "claude-3-5-haiku-latest"),
            ),
            LlmProvider::OpenAi => (
                env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                first_env(&["OPENAI_API_KEY"]),
                env_or("OPENAI_MODEL", "gpt-4o-mini"),
            ),
            LlmProvider::Mock => (String::new(), String::new(), "mock".to_string()),
        };

        Self {
            provider,
            base_url,
            api_key,
            model,
            temperature: std::env::var("AGENTFLOW_LLM_TEMPERATURE")
                .ok()
                .and_then(|t| t.parse().ok()),
            max_tokens: std::env::var("AGENTFLOW_LLM_MAX_TOKENS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(2048),
            timeout_secs: std::env::var("AGENTFLOW_LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(120),
        }
    }

    pub fn from_env() -> Self {
        let provider = std::env::var("AGENTFLOW_LLM_PROVIDER")
            .ok()
            .and_then(|p| LlmProvider::from_str(&p))
            .unwrap_or_default();
        Self::for_provider(provider)
    }
}

/// Credentials and endpoint for the meeting scheduling API.
///
/// Missing credentials are only an error once a scheduler agent is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    pub base_url: String,
    /// Account the meeting is booked under unless a step overrides it.
    pub user_id: String,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_env("ZOOM_API_KEY"),
            api_secret: non_empty_env("ZOOM_API_SECRET"),
            base_url: env_or("ZOOM_API_BASE_URL", "https://api.zoom.us/v2"),
            user_id: env_or("ZOOM_USER_ID", "me"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub db_path: String,
    pub llm: LlmConfig,
    pub scheduler: SchedulerConfig,
}

/// On-disk override layer; every field optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    db_path: Option<String>,
    #[serde(default)]
    llm: LlmSection,
    #[serde(default)]
    scheduler: SchedulerSection,
}

#[derive(Debug, Default, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerSection {
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: Option<String>,
    user_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: env_or("AGENTFLOW_DB_PATH", "agentflow.db"),
            llm: LlmConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }

    /// Environment defaults overridden by a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, FlowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, FlowError> {
        let file: ConfigFile = serde_yaml::from_str(yaml)
            .map_err(|e| FlowError::Config(format!("Failed to parse config YAML: {}", e)))?;
        let mut config = Self::from_env();

        if let Some(db_path) = file.db_path {
            config.db_path = expand_home(&resolve_env_vars(&db_path));
        }

        if let Some(ref provider) = file.llm.provider {
            let provider = LlmProvider::from_str(&resolve_env_vars(provider)).ok_or_else(|| {
                FlowError::Config(format!("Unknown LLM provider '{}'", provider))
            })?;
            if provider != config.llm.provider {
                config.llm = LlmConfig::for_provider(provider);
            }
        }
        if let Some(v) = file.llm.base_url {
            config.llm.base_url = resolve_env_vars(&v);
        }
        if let Some(v) = file.llm.api_key {
            config.llm.api_key = resolve_env_vars(&v);
        }
        if let Some(v) = file.llm.model {
            config.llm.model = resolve_env_vars(&v);
        }
        if file.llm.temperature.is_some() {
            config.llm.temperature = file.llm.temperature;
        }
        if let Some(v) = file.llm.max_tokens {
            config.llm.max_tokens = v;
        }
        if let Some(v) = file.llm.timeout_secs {
            config.llm.timeout_secs = v;
        }

        if let Some(v) = file.scheduler.api_key {
            config.scheduler.api_key = Some(resolve_env_vars(&v)).filter(|s| !s.is_empty());
        }
        if let Some(v) = file.scheduler.api_secret {
            config.scheduler.api_secret = Some(resolve_env_vars(&v)).filter(|s| !s.is_empty());
        }
        if let Some(v) = file.scheduler.base_url {
            config.scheduler.base_url = resolve_env_vars(&v);
        }
        if let Some(v) = file.scheduler.user_id {
            config.scheduler.user_id = resolve_env_vars(&v);
        }

        Ok(config)
    }
}

/// Resolve environment variable references in a string.
/// Supports `${ENV_VAR}` and `${ENV_VAR:-default}` syntax; unknown
/// variables without a default are left as written.
pub fn resolve_env_vars(input: &str) -> String {
    let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var_expr = &caps[1];
        if let Some(idx) = var_expr.find(":-") {
            let var_name = &var_expr[..idx];
            let default_val = &var_expr[idx + 2..];
            std::env::var(var_name).unwrap_or_else(|_| default_val.to_string())
        } else {
            std::env::var(var_expr).unwrap_or_else(|_| format!("${{{}}}", var_expr))
        }
    })
    .to_string()
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}

fn env_or(key: &str, default: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| default.to_string())
}

fn first_env(keys: &[&str]) -> String {
    keys.iter().find_map(|k| non_empty_env(k)).unwrap_or_default()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
