//! Input Adapter: shapes a generic workflow envelope for the first agent.
//!
//! Routing looks at the agent's declared input properties in a fixed order
//! (`transcript`, `content`, `email`, then a generic `input` fallback) and
//! puts the envelope's primary text there. Required fields still missing
//! afterwards are backfilled from variables, the `content`/`transcript`
//! synonym, or an empty value of the declared type.

use std::io::Write;
use std::path::PathBuf;

use serde_json::{json, Value};

use crate::models::{AgentSpec, Payload, UploadedFile, WorkflowInput};

/// An uploaded file after staging.
#[derive(Debug, Default)]
struct StagedFile {
    path: Option<PathBuf>,
    text: Option<String>,
}

pub struct InputAdapter;

impl InputAdapter {
    /// Adapt `input` for `agent`. Never fails; staging problems are logged
    /// and the file is ignored.
    pub fn adapt(input: &WorkflowInput, agent: &AgentSpec, file: Option<&UploadedFile>) -> Payload {
        tracing::debug!(
            "[InputAdapter] Adapting input for agent '{}' (file: {})",
            agent.name,
            file.is_some()
        );

        let staged = file.map(stage_file).unwrap_or_default();
        let main_content = match staged.text {
            Some(ref text) if !text.is_empty() => text.clone(),
            _ => input.content.clone(),
        };

        let schema = &agent.input_schema;
        let mut adapted = Payload::new();

        if schema.has_property("transcript") {
            adapted.insert("transcript".into(), json!(main_content));
        } else if schema.has_property("content") {
            adapted.insert("content".into(), json!(main_content));
            if schema.has_property("keywords") {
                if let Some(raw) = input.variables.get("keywords").filter(|k| !k.is_empty()) {
                    let keywords: Vec<&str> = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .collect();
                    adapted.insert("keywords".into(), json!(keywords));
                }
            }
        } else if schema.has_property("email") {
            let var = |key: &str, default: &str| {
                input
                    .variables
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| default.to_string())
            };
            adapted.insert(
                "email".into(),
                json!({
                    "subject": var("subject", "No Subject"),
                    "body": main_content,
                    "sender": var("sender", "user@example.com"),
                    "sender_name": var("sender_name", "User"),
                }),
            );
        } else {
            adapted.insert("input".into(), json!(main_content));
            for (key, value) in &input.variables {
                adapted.insert(key.clone(), json!(value));
            }
            if let Some(ref path) = staged.path {
                adapted.insert("file_path".into(), json!(path.to_string_lossy()));
            }
        }

        if !input.context.is_empty() {
            adapted.insert("context".into(), Value::Object(input.context.clone()));
        }

        for field in &schema.required {
            if adapted.contains_key(field) {
                continue;
            }
            let value = if let Some(value) = input.variables.get(field) {
                json!(value)
            } else if field == "content" && adapted.contains_key("transcript") {
                adapted["transcript"].clone()
            } else if field == "transcript" && adapted.contains_key("content") {
                adapted["content"].clone()
            } else {
                schema.type_default(field)
            };
            adapted.insert(field.clone(), value);
        }

        tracing::debug!(
            "[InputAdapter] Adapted keys: {:?}",
            adapted.keys().collect::<Vec<_>>()
        );
        adapted
    }
}

/// Write the upload to a kept temp file, decoding its text when the declared
/// content type is textual.
fn stage_file(file: &UploadedFile) -> StagedFile {
    let mut staged = StagedFile::default();

    let suffix = file.suffix();
    let written = tempfile::Builder::new()
        .prefix("agentflow-upload-")
        .suffix(&suffix)
        .tempfile()
        .and_then(|mut tmp| {
            tmp.write_all(&file.bytes)?;
            tmp.keep().map_err(|e| e.error)
        });
    match written {
        Ok((_, path)) => staged.path = Some(path),
        Err(e) => tracing::error!("[InputAdapter] Failed to stage '{}': {}", file.filename, e),
    }

    if file.is_text() {
        match String::from_utf8(file.bytes.clone()) {
            Ok(text) => {
                tracing::debug!("[InputAdapter] File content length: {}", text.len());
                staged.text = Some(text);
            }
            Err(e) => tracing::error!("[InputAdapter] '{}' is not UTF-8: {}", file.filename, e),
        }
    }
    staged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentKind;
    use crate::schema::{PropertySpec, SchemaSpec, SchemaType};
    use crate::store::builtin_agents;

    fn agent_with(schema: SchemaSpec) -> AgentSpec {
        let mut agent = builtin_agents().remove(0);
        agent.kind = AgentKind::GrammarChecker;
        agent.input_schema = schema;
        agent
    }

    #[test]
    fn test_transcript_agent_gets_exactly_transcript() {
        let agent = agent_with(
            SchemaSpec::object().property("transcript", PropertySpec::of(SchemaType::String)),
        );
        let adapted = InputAdapter::adapt(&WorkflowInput::from_content("hello world"), &agent, None);

        let mut expected = Payload::new();
        expected.insert("transcript".into(), json!("hello world"));
        assert_eq!(adapted, expected);
    }

    #[test]
    fn test_content_agent_splits_keywords() {
        let seo = builtin_agents().remove(0);
        let input = WorkflowInput::from_content("Blog post").with_variable("keywords", "rust, async ,, tokio");
        let adapted = InputAdapter::adapt(&input, &seo, None);
        assert_eq!(adapted["content"], "Blog post");
        assert_eq!(adapted["keywords"], json!(["rust", "async", "tokio"]));
    }

    #[test]
    fn test_email_agent_synthesizes_email() {
        let email_agent = builtin_agents().remove(2);
        let input = WorkflowInput::from_content("Can we meet?").with_variable("subject", "Sync");
        let adapted = InputAdapter::adapt(&input, &email_agent, None);
        assert_eq!(
            adapted["email"],
            json!({
                "subject": "Sync",
                "body": "Can we meet?",
                "sender": "user@example.com",
                "sender_name": "User",
            })
        );
    }

    #[test]
    fn test_generic_agent_flattens_variables_and_context() {
        let agent = agent_with(
            SchemaSpec::object()
                .property("meeting_topic", PropertySpec::of(SchemaType::String))
                .property("attendees", PropertySpec::of(SchemaType::Array))
                .require("attendees"),
        );
        let mut input = WorkflowInput::from_content("plan").with_variable("meeting_topic", "Retro");
        input.context.insert("team".into(), json!("core"));

        let adapted = InputAdapter::adapt(&input, &agent, None);
        assert_eq!(adapted["input"], "plan");
        assert_eq!(adapted["meeting_topic"], "Retro");
        assert_eq!(adapted["context"], json!({ "team": "core" }));
        assert_eq!(adapted["attendees"], json!([]));
    }

    #[test]
    fn test_required_synonym_backfill() {
        let agent = agent_with(
            SchemaSpec::object()
                .property("transcript", PropertySpec::of(SchemaType::String))
                .property("content", PropertySpec::of(SchemaType::String))
                .require("content"),
        );
        let adapted = InputAdapter::adapt(&WorkflowInput::from_content("notes"), &agent, None);
        assert_eq!(adapted["transcript"], "notes");
        assert_eq!(adapted["content"], "notes");
    }

    #[test]
    fn test_text_file_overrides_content() {
        let summarizer = builtin_agents().remove(1);
        let file = UploadedFile::new("call.txt", Some("text/plain"), b"Alice: hi".to_vec());
        let adapted =
            InputAdapter::adapt(&WorkflowInput::from_content("ignored"), &summarizer, Some(&file));
        assert_eq!(adapted["transcript"], "Alice: hi");

        let binary = UploadedFile::new("deck.pdf", Some("application/pdf"), vec![0xff, 0x00]);
        let adapted =
            InputAdapter::adapt(&WorkflowInput::from_content("kept"), &summarizer, Some(&binary));
        assert_eq!(adapted["transcript"], "kept");
    }

    #[test]
    fn test_generic_agent_receives_staged_file_path() {
        let agent = agent_with(SchemaSpec::object());
        let file = UploadedFile::new("data.csv", Some("text/csv"), b"a,b\n1,2".to_vec());
        let adapted = InputAdapter::adapt(&WorkflowInput::default(), &agent, Some(&file));

        assert_eq!(adapted["input"], "a,b\n1,2");
        let path = PathBuf::from(adapted["file_path"].as_str().unwrap());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2");
        std::fs::remove_file(path).unwrap();
    }
}
