use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::text::extract_text_content;
use super::Agent;
use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::models::{AgentKind, ExecutionContext, Payload};
use crate::schema::{PropertySpec, SchemaSpec, SchemaType};

/// Grammar and style review.
///
/// The model's reply is returned as `suggestions`; `corrected_text` always
/// echoes the input text unchanged.
pub struct GrammarChecker {
    llm: Arc<dyn LlmClient>,
    model_name: Option<String>,
}

impl GrammarChecker {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Payload) -> Self {
        let model_name = config
            .get("model_name")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string);
        tracing::info!(
            "[GrammarChecker] Initialized (model={})",
            model_name.as_deref().unwrap_or(llm.model())
        );
        Self { llm, model_name }
    }
}

fn review_prompt(content: &str) -> String {
    format!(
        "Review the following text for grammar, spelling, punctuation, clarity, and style issues.\n\n\
         Text to review:\n\
         {content}\n\n\
         Provide:\n\
         1. Corrected version of the text\n\
         2. List of specific improvements or suggestions"
    )
}

#[async_trait]
impl Agent for GrammarChecker {
    fn name(&self) -> &str {
        AgentKind::GrammarChecker.display_name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::GrammarChecker
    }

    fn input_schema(&self) -> SchemaSpec {
        SchemaSpec::object()
            .property(
                "content",
                PropertySpec::of(SchemaType::String)
                    .describe("The text content to be checked and corrected."),
            )
            .property("transcript", PropertySpec::of(SchemaType::String))
            .property("summary", PropertySpec::of(SchemaType::String))
            .property("email", PropertySpec::of(SchemaType::Object))
    }

    fn output_schema(&self) -> SchemaSpec {
        let string = |d: &str| PropertySpec::of(SchemaType::String).describe(d);
        SchemaSpec::object()
            .property(
                "corrected_text",
                string("The text with grammar and style corrections applied."),
            )
            .property(
                "suggestions",
                string("Specific suggestions for further improvement."),
            )
            .property(
                "original_text",
                string("The original, uncorrected text (for comparison)."),
            )
    }

    fn config_schema(&self) -> SchemaSpec {
        SchemaSpec::object().property(
            "model_name",
            PropertySpec::of(SchemaType::String).describe("The name of the model to use."),
        )
    }

    async fn process(
        &mut self,
        input: Payload,
        _context: Option<&ExecutionContext>,
    ) -> Result<Payload, AgentError> {
        let content = extract_text_content(&input);
        let mut out = Payload::new();
        if content.trim().is_empty() {
            out.insert("error".into(), json!("No content provided for grammar checking"));
            return Ok(out);
        }

        let suggestions = match self
            .llm
            .generate_with_model(&review_prompt(&content), self.model_name.as_deref())
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => "No grammar issues found.".to_string(),
            Err(e) => {
                tracing::error!("[GrammarChecker] LLM review failed: {}", e);
                format!("Error during grammar check: {}", e)
            }
        };

        out.insert("original_text".into(), json!(content));
        out.insert("corrected_text".into(), json!(content));
        out.insert("suggestions".into(), json!(suggestions));
        Ok(out)
    }
}
