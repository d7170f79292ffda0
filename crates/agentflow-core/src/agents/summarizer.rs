//! Meeting summarizer.
//!
//! The primary path asks the LLM four separate questions (summary,
//! participants, action items, duration). Any LLM failure abandons that path
//! and the whole result is rebuilt from local heuristics instead.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::text::extract_text_content;
use super::{config_bool, config_str, knowledge_item, Agent};
use crate::error::AgentError;
use crate::llm::parse::{parse_bounded_int, parse_json_array, parse_string_list};
use crate::llm::{LlmClient, LlmError};
use crate::models::{AgentKind, ExecutionContext, KnowledgeItem, Payload};
use crate::schema::{PropertySpec, SchemaSpec, SchemaType};

const TOO_SHORT_SUMMARY: &str = "No transcript provided or transcript too short to summarize.";
const KNOWLEDGE_COLLECTION: &str = "meeting_knowledge";

pub struct MeetingSummarizer {
    llm: Arc<dyn LlmClient>,
    summary_length: String,
    extract_actions: bool,
    published: Vec<KnowledgeItem>,
}

struct Summary {
    summary: String,
    action_items: Vec<Value>,
    participants: Vec<String>,
    duration_minutes: i64,
}

impl MeetingSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Payload) -> Self {
        let summary_length = config_str(config, "summary_length", "medium");
        let extract_actions = config_bool(config, "extract_actions", true);
        tracing::info!(
            "[Summarizer] Initialized (summary_length={}, extract_actions={})",
            summary_length,
            extract_actions
        );
        Self {
            llm,
            summary_length,
            extract_actions,
            published: Vec::new(),
        }
    }

    async fn summarize_with_llm(
        &self,
        transcript: &str,
        prompt_context: &str,
    ) -> Result<Summary, LlmError> {
        let summary = self
            .llm
            .generate(&self.summary_prompt(transcript, prompt_context))
            .await?
            .trim()
            .to_string();

        let reply = self.llm.generate(&participants_prompt(transcript)).await?;
        let participants = parse_string_list(&reply);

        let action_items = if self.extract_actions {
            let reply = self.llm.generate(&action_items_prompt(transcript)).await?;
            parse_json_array(&reply).unwrap_or_else(|| {
                tracing::warn!("[Summarizer] Failed to parse action items reply, using none");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let reply = self.llm.generate(&duration_prompt(transcript)).await?;
        let duration_minutes = parse_bounded_int(&reply, 1, 180).unwrap_or_else(|| {
            tracing::warn!("[Summarizer] Invalid duration reply '{}', estimating", reply.trim());
            estimate_duration(transcript)
        });

        Ok(Summary {
            summary,
            action_items,
            participants,
            duration_minutes,
        })
    }

    fn summarize_locally(&self, transcript: &str) -> Summary {
        Summary {
            summary: format!(
                "The meeting covered the following key points: {}.",
                extract_key_points(transcript)
            ),
            action_items: if self.extract_actions {
                extract_action_items(transcript)
            } else {
                Vec::new()
            },
            participants: extract_participants(transcript),
            duration_minutes: estimate_duration(transcript),
        }
    }

    fn summary_prompt(&self, transcript: &str, prompt_context: &str) -> String {
        let length_desc = match self.summary_length.as_str() {
            "short" => "a brief 2-3 sentence",
            "medium" => "a comprehensive 1-paragraph",
            "long" => "a detailed multi-paragraph",
            _ => "a 1-paragraph",
        };
        let focus = if prompt_context.trim().is_empty() {
            String::new()
        } else {
            format!("Focus on: {}", prompt_context)
        };
        format!(
            "You are an AI that creates {length_desc} summary of meeting transcripts.\n\
             Focus on key discussions, decisions made, and important points.\n\
             Do NOT include metadata like meeting date, attendee list, or timestamps in the summary.\n\
             Provide a concise, business-appropriate summary focused only on the content of the discussions.\n\n\
             {focus}\n\
             Meeting Transcript:\n\
             {transcript}\n"
        )
    }
}

fn participants_prompt(transcript: &str) -> String {
    format!(
        "You are an AI that extracts the names of participants from meeting transcripts.\n\
         Focus on the actual people's names, not generic roles like 'Facilitator' or 'Note Taker'.\n\
         Look for names especially in the attendance list or speaker identifiers (like 'SJ:' for Sarah Johnson).\n\
         Return only the list of unique participant names in JSON format as an array of strings.\n\n\
         Meeting Transcript:\n\
         {transcript}\n"
    )
}

fn action_items_prompt(transcript: &str) -> String {
    format!(
        "You are an AI that extracts action items and tasks from meeting transcripts.\n\
         Pay SPECIAL ATTENTION to lines explicitly labeled as 'ACTION ITEM:' or similar markers.\n\
         Look for clear assignments of responsibilities in the text.\n\
         For each action item, extract:\n\
         1. The task description (be specific and detailed)\n\
         2. The assignee (the person responsible)\n\
         3. Any deadline mentioned (e.g., 'by Thursday', 'today', etc.)\n\n\
         Return the list in JSON format as an array of objects with 'task', 'assignee', 'deadline' (if available), and 'status' fields. \
         The 'status' should always be set to 'pending'.\n\n\
         Example format:\n\
         [\n    \
         {{\"task\": \"Prepare a budget report\", \"assignee\": \"Michael\", \"deadline\": \"Thursday\", \"status\": \"pending\"}},\n    \
         {{\"task\": \"Schedule team training\", \"assignee\": \"Sarah\", \"deadline\": null, \"status\": \"pending\"}}\n\
         ]\n\n\
         Meeting Transcript:\n\
         {transcript}\n"
    )
}

fn duration_prompt(transcript: &str) -> String {
    format!(
        "You are an AI that estimates the duration of a meeting in minutes based on its transcript.\n\
         Consider factors like:\n\
         - The presence of timestamps (if any).\n\
         - The density of conversation (long blocks of text might indicate a longer meeting).\n\
         - The number of topics discussed.\n\n\
         Return ONLY the estimated duration as a single integer (number of minutes).\n\
         Do NOT include any explanations or extra text.\n\n\
         Meeting Transcript:\n\
         {transcript}\n"
    )
}

/// Roughly 150 spoken words per minute, clamped to `[1, 180]`.
pub fn estimate_duration(transcript: &str) -> i64 {
    let words = transcript.split_whitespace().count() as f64;
    ((words / 150.0).round_ties_even() as i64).clamp(1, 180)
}

/// Speaker labels (`Name:`) in order of first appearance.
pub fn extract_participants(transcript: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r"([A-Z][a-z]+):") else {
        return Vec::new();
    };
    let mut participants: Vec<String> = Vec::new();
    for caps in re.captures_iter(transcript) {
        let name = &caps[1];
        if !participants.iter().any(|p| p == name) {
            participants.push(name.to_string());
        }
    }
    participants
}

/// All sentences for short transcripts, otherwise the first two, the middle
/// one and the last two.
pub fn extract_key_points(transcript: &str) -> String {
    let Ok(re) = Regex::new(r"[.!?]+") else {
        return transcript.trim().to_string();
    };
    let sentences: Vec<&str> = re
        .split(transcript)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.len() <= 5 {
        return sentences.join(" ");
    }

    let n = sentences.len();
    let mut selected = sentences[..2].to_vec();
    selected.push(sentences[n / 2]);
    selected.extend_from_slice(&sentences[n - 2..]);
    selected.join(" ")
}

pub fn extract_action_items(transcript: &str) -> Vec<Value> {
    let labelled = r"(?:TODO|TO-DO|Action item|Action|Task):\s*([^\n.]+)";
    let assigned = r"([A-Z][a-z]+) (?:will|should|needs to|has to) ([^\n.]+)";
    let collective = r"(?:Let's|We should|We need to) ([^\n.]+)";

    let mut items = Vec::new();
    for pattern in [labelled, assigned, collective] {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(transcript) {
            let item = match (caps.get(1), caps.get(2)) {
                (Some(assignee), Some(task)) => json!({
                    "task": task.as_str().trim(),
                    "assignee": assignee.as_str(),
                    "status": "pending",
                }),
                (Some(task), None) => json!({
                    "task": task.as_str().trim(),
                    "assignee": null,
                    "status": "pending",
                }),
                _ => continue,
            };
            items.push(item);
        }
    }
    items
}

#[async_trait]
impl Agent for MeetingSummarizer {
    fn name(&self) -> &str {
        AgentKind::MeetingSummarizer.display_name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::MeetingSummarizer
    }

    fn input_schema(&self) -> SchemaSpec {
        let string = || PropertySpec::of(SchemaType::String);
        SchemaSpec::object()
            .property("transcript", string().describe("Meeting transcript to summarize"))
            .property(
                "content",
                string().describe("Alternative content field (used if transcript is not provided)"),
            )
            .property(
                "summary",
                string().describe("Summary from previous processing (used if no transcript/content)"),
            )
            .property(
                "email",
                PropertySpec::of(SchemaType::Object)
                    .describe("Email containing transcript in body field"),
            )
    }

    fn output_schema(&self) -> SchemaSpec {
        let string = || PropertySpec::of(SchemaType::String);
        SchemaSpec::object()
            .property("summary", string().describe("Concise summary of the meeting"))
            .property(
                "action_items",
                PropertySpec::of(SchemaType::Array)
                    .with_items(
                        PropertySpec::of(SchemaType::Object)
                            .with_property("task", string())
                            .with_property(
                                "assignee",
                                PropertySpec::one_of(&[SchemaType::String, SchemaType::Null]),
                            )
                            .with_property("status", string()),
                    )
                    .describe("Action items extracted from the meeting"),
            )
            .property(
                "participants",
                PropertySpec::of(SchemaType::Array)
                    .with_items(string())
                    .describe("Meeting participants"),
            )
            .property(
                "duration_minutes",
                PropertySpec::of(SchemaType::Integer).describe("Estimated meeting duration"),
            )
    }

    fn config_schema(&self) -> SchemaSpec {
        SchemaSpec::object()
            .property(
                "summary_length",
                PropertySpec::of(SchemaType::String)
                    .with_enum(&["short", "medium", "long"])
                    .with_default(json!("medium")),
            )
            .property(
                "extract_actions",
                PropertySpec::of(SchemaType::Boolean).with_default(json!(true)),
            )
    }

    async fn process(
        &mut self,
        input: Payload,
        context: Option<&ExecutionContext>,
    ) -> Result<Payload, AgentError> {
        self.published.clear();
        let transcript = extract_text_content(&input);

        if transcript.trim().chars().count() < 10 {
            tracing::warn!("[Summarizer] No transcript provided or transcript too short");
            let mut out = Payload::new();
            out.insert("summary".into(), json!(TOO_SHORT_SUMMARY));
            out.insert("action_items".into(), json!([]));
            out.insert("participants".into(), json!([]));
            out.insert("duration_minutes".into(), json!(0));
            return Ok(out);
        }

        let prompt_context = context.map(|c| c.original_prompt()).unwrap_or_default();
        let result = match self.summarize_with_llm(&transcript, prompt_context).await {
            Ok(result) => {
                self.published.push(knowledge_item(
                    KNOWLEDGE_COLLECTION,
                    format!("Meeting summary: {}", result.summary),
                    &[("type", "meeting_summary"), ("content_type", "summary")],
                ));
                if !result.action_items.is_empty() {
                    self.published.push(knowledge_item(
                        KNOWLEDGE_COLLECTION,
                        format!(
                            "Action items: {}",
                            serde_json::to_string(&result.action_items)
                                .map_err(|e| AgentError::Internal(e.to_string()))?
                        ),
                        &[("type", "meeting_summary"), ("content_type", "action_items")],
                    ));
                }
                tracing::info!("[Summarizer] LLM summarization succeeded");
                result
            }
            Err(e) => {
                tracing::warn!("[Summarizer] LLM summarization failed: {}. Using fallback methods.", e);
                self.summarize_locally(&transcript)
            }
        };

        let mut out = Payload::new();
        out.insert("summary".into(), json!(result.summary));
        out.insert("action_items".into(), Value::Array(result.action_items));
        out.insert("participants".into(), json!(result.participants));
        out.insert("duration_minutes".into(), json!(result.duration_minutes));
        out.insert("transcript".into(), json!(transcript));
        Ok(out)
    }

    fn published_knowledge(&self) -> Vec<KnowledgeItem> {
        self.published.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    const TRANSCRIPT: &str = "Meeting Transcript:\nJohn: Let's discuss the project timeline.\nJane: I think we need two weeks for testing.";

    fn input(transcript: &str) -> Payload {
        let mut p = Payload::new();
        p.insert("transcript".into(), json!(transcript));
        p
    }

    #[tokio::test]
    async fn test_short_transcript_skips_llm() {
        let llm = Arc::new(MockLlmClient::new("unused"));
        let mut agent = MeetingSummarizer::new(llm.clone(), &Payload::new());

        let out = agent.process(input("  hi  "), None).await.unwrap();
        assert_eq!(out["summary"], TOO_SHORT_SUMMARY);
        assert_eq!(out["duration_minutes"], 0);
        assert_eq!(out["action_items"], json!([]));
        assert_eq!(out["participants"], json!([]));
        assert_eq!(llm.call_count(), 0);
        assert!(agent.published_knowledge().is_empty());
    }

    #[tokio::test]
    async fn test_llm_path_parses_each_reply() {
        let llm = Arc::new(
            MockLlmClient::new("The team agreed on a timeline.")
                .with_reply("names of participants", "Here: [\"John\", \"Jane\"]")
                .with_reply(
                    "extracts action items",
                    "```json\n[{\"task\": \"Plan testing\", \"assignee\": \"Jane\", \"status\": \"pending\"}]\n```",
                )
                .with_reply("estimates the duration", "25"),
        );
        let mut config = Payload::new();
        config.insert("summary_length".into(), json!("short"));
        let mut agent = MeetingSummarizer::new(llm.clone(), &config);

        let out = agent.process(input(TRANSCRIPT), None).await.unwrap();
        assert_eq!(out["summary"], "The team agreed on a timeline.");
        assert_eq!(out["participants"], json!(["John", "Jane"]));
        assert_eq!(out["action_items"][0]["assignee"], "Jane");
        assert_eq!(out["duration_minutes"], 25);
        assert_eq!(out["transcript"], TRANSCRIPT);
        assert_eq!(llm.call_count(), 4);
        assert!(llm.prompts()[0].contains("a brief 2-3 sentence"));

        let knowledge = agent.published_knowledge();
        assert_eq!(knowledge.len(), 2);
        assert_eq!(knowledge[0].collection, "meeting_knowledge");
        assert!(knowledge[1].document.starts_with("Action items: "));
    }

    #[tokio::test]
    async fn test_non_integer_duration_uses_estimate() {
        let llm = Arc::new(
            MockLlmClient::new("[]").with_reply("estimates the duration", "about an hour"),
        );
        let mut agent = MeetingSummarizer::new(llm, &Payload::new());
        let out = agent.process(input(TRANSCRIPT), None).await.unwrap();
        assert_eq!(out["duration_minutes"], 1);
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_heuristics() {
        let llm = Arc::new(MockLlmClient::unavailable());
        let mut agent = MeetingSummarizer::new(llm, &Payload::new());

        let out = agent.process(input(TRANSCRIPT), None).await.unwrap();
        let participants: Vec<String> =
            serde_json::from_value(out["participants"].clone()).unwrap();
        assert!(participants.contains(&"John".to_string()));
        assert!(participants.contains(&"Jane".to_string()));
        assert!(out["summary"]
            .as_str()
            .unwrap()
            .starts_with("The meeting covered the following key points: "));
        assert_eq!(out["duration_minutes"], 1);
        assert_eq!(out["action_items"][0]["task"], "discuss the project timeline");
        assert!(agent.published_knowledge().is_empty());
    }

    #[test]
    fn test_estimate_duration_bounds() {
        assert_eq!(estimate_duration("one two"), 1);
        assert_eq!(estimate_duration(&"w ".repeat(300)), 2);
        assert_eq!(estimate_duration(&"w ".repeat(375)), 2);
        assert_eq!(estimate_duration(&"w ".repeat(30_000)), 180);
    }

    #[test]
    fn test_key_points_selection() {
        assert_eq!(extract_key_points("A. B! C?"), "A B C");
        assert_eq!(extract_key_points("1. 2. 3. 4. 5. 6. 7."), "1 2 4 6 7");
    }

    #[test]
    fn test_action_item_patterns() {
        let items = extract_action_items("TODO: send notes\nMary will book the room. Let's celebrate.");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], json!({ "task": "send notes", "assignee": null, "status": "pending" }));
        assert_eq!(items[1]["assignee"], "Mary");
        assert_eq!(items[1]["task"], "book the room");
        assert_eq!(items[2]["task"], "celebrate");
    }
}
