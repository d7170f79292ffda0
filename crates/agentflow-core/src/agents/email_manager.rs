//! Smart email manager.
//!
//! Runs in one of three modes:
//! - `categorize` and `prioritize` are pure keyword rules and never call the LLM.
//! - `draft_response` asks the LLM for a reply shaped by what the previous
//!   step produced (meeting summary, SEO analysis, grammar check or plain
//!   text), falling back to canned templates when the LLM is unavailable.
//!
//! When the input carries no `email` object, one is synthesized from the
//! upstream payload so every mode has a subject, body and sender to work on.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::text::{extract_text_content, str_field, string_list};
use super::{config_str, into_payload, knowledge_item, Agent};
use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::models::{AgentKind, ExecutionContext, KnowledgeItem, Payload};
use crate::schema::{PropertySpec, SchemaSpec, SchemaType};

const CATEGORY_KEYWORDS: [(&str, &[&str]); 7] = [
    ("sales", &["purchase", "buy", "order", "customer", "pricing", "quote"]),
    (
        "support",
        &["help", "issue", "problem", "doesn't work", "broken", "fix", "error"],
    ),
    (
        "marketing",
        &["campaign", "promotion", "advertis", "market", "social media"],
    ),
    (
        "finance",
        &["invoice", "payment", "bill", "budget", "expense", "financial"],
    ),
    (
        "hr",
        &["vacation", "leave", "benefits", "hiring", "interview", "salary"],
    ),
    ("legal", &["contract", "agreement", "compliance", "legal", "terms"]),
    (
        "product",
        &["feature", "improvement", "suggestion", "roadmap", "product"],
    ),
];

const URGENCY_KEYWORDS: [&str; 7] = [
    "urgent",
    "asap",
    "immediate",
    "emergency",
    "critical",
    "important",
    "deadline",
];
const VIP_DOMAINS: [&str; 3] = ["bigcustomer.com", "partner.com", "investor.com"];
const TIME_WORDS: [&str; 5] = ["today", "tomorrow", "asap", "soon", "this week"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailMode {
    Categorize,
    Prioritize,
    DraftResponse,
}

impl EmailMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "categorize" => Some(Self::Categorize),
            "prioritize" => Some(Self::Prioritize),
            "draft_response" => Some(Self::DraftResponse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTone {
    Professional,
    Friendly,
    Concise,
}

impl ResponseTone {
    /// Unknown tones read as professional.
    pub fn from_str(s: &str) -> Self {
        match s {
            "friendly" => Self::Friendly,
            "concise" => Self::Concise,
            _ => Self::Professional,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Concise => "concise",
        }
    }

    /// Tone wording for replies to upstream agent results.
    fn content_description(&self) -> &'static str {
        match self {
            Self::Professional => "formal, business-appropriate",
            Self::Friendly => "warm and conversational",
            Self::Concise => "brief and to-the-point",
        }
    }

    /// Tone wording for replies to ordinary emails.
    fn email_description(&self) -> &'static str {
        match self {
            Self::Professional => "formal, polite, and business-appropriate",
            Self::Friendly => "warm, personable, and conversational",
            Self::Concise => "brief, direct, and to-the-point without unnecessary details",
        }
    }

    fn greeting(&self, name: &str) -> String {
        match self {
            Self::Professional => format!("Dear {},", name),
            Self::Friendly | Self::Concise => format!("Hi {},", name),
        }
    }

    fn signoff(&self) -> &'static str {
        match self {
            Self::Professional => "Best regards,\n[Your Name]",
            Self::Friendly => "Thanks,\n[Your Name]",
            Self::Concise => "Regards,\n[Your Name]",
        }
    }
}

/// Shape of the upstream payload, by which keys it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    MeetingSummary,
    SeoOptimization,
    GrammarCheck,
    Generic,
}

impl ContentType {
    pub fn detect(input: &Payload) -> Self {
        let has = |k: &str| input.contains_key(k);
        if has("summary") && (has("action_items") || has("participants") || has("duration_minutes")) {
            Self::MeetingSummary
        } else if has("recommendations") && has("seo_score") {
            Self::SeoOptimization
        } else if has("corrected_text") && has("grammar_issues") {
            Self::GrammarCheck
        } else {
            Self::Generic
        }
    }
}

/// The email being handled, real or synthesized.
#[derive(Debug, Clone, Default)]
struct Email {
    id: Option<String>,
    subject: Option<String>,
    body: String,
    sender: String,
    sender_name: Option<String>,
    participants: Vec<String>,
    categories: Vec<String>,
    priority_level: Option<String>,
}

impl Email {
    fn from_object(obj: &Payload) -> Self {
        let text = |k: &str| str_field(obj, k).map(str::to_string);
        Self {
            id: obj.get("id").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }),
            subject: text("subject"),
            body: text("body").unwrap_or_default(),
            sender: text("sender").unwrap_or_default(),
            sender_name: text("sender_name"),
            participants: string_list(obj, "participants"),
            ..Default::default()
        }
    }

    fn synthetic(subject: &str, body: String, sender: &str, sender_name: &str) -> Self {
        Self {
            subject: Some(subject.to_string()),
            body,
            sender: sender.to_string(),
            sender_name: Some(sender_name.to_string()),
            ..Default::default()
        }
    }

    fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("unknown")
    }

    fn subject_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.subject.as_deref().unwrap_or(default)
    }

    fn reply_name(&self) -> String {
        self.sender_name
            .clone()
            .or_else(|| self.participants.first().cloned())
            .unwrap_or_else(|| "Sender".to_string())
    }
}

pub struct EmailManager {
    llm: Arc<dyn LlmClient>,
    mode: String,
    tone: ResponseTone,
    published: Vec<KnowledgeItem>,
}

impl EmailManager {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Payload) -> Self {
        let mode = config_str(config, "mode", "categorize");
        let tone = ResponseTone::from_str(&config_str(config, "response_tone", "professional"));
        tracing::info!(
            "[EmailManager] Initialized (mode={}, response_tone={})",
            mode,
            tone.as_str()
        );
        Self {
            llm,
            mode,
            tone,
            published: Vec::new(),
        }
    }

    fn resolve_email(input: &Payload, content_type: ContentType) -> Email {
        let mut email = match input.get("email").and_then(Value::as_object) {
            Some(obj) if !obj.is_empty() => Email::from_object(obj),
            _ => synthesize_email(input, content_type),
        };
        if input.contains_key("categories") {
            email.categories = string_list(input, "categories");
        }
        if let Some(level) = str_field(input, "priority_level") {
            email.priority_level = Some(level.to_string());
        }
        email
    }

    async fn draft_for_content(
        &self,
        email: &Email,
        input: &Payload,
        content_type: ContentType,
        user_prompt: &str,
    ) -> Payload {
        let specific = match content_type {
            ContentType::MeetingSummary => {
                let subject = email.subject_or("Meeting Summary");
                let prompt = meeting_prompt(self.tone, subject, &email.body, input, user_prompt);
                let follow_up = match input.get("action_items").and_then(Value::as_array) {
                    Some(items) if !items.is_empty() => json!("in 1 day"),
                    _ => Value::Null,
                };
                self.ask(&prompt).await.map(|body| {
                    json!({
                        "email_id": email.id(),
                        "subject": format!("Re: {}", subject),
                        "response_body": body,
                        "suggested_follow_up": follow_up,
                        "status": "success",
                        "original_content": str_field(input, "summary").unwrap_or_default(),
                    })
                })
            }
            ContentType::SeoOptimization => {
                let subject = email.subject_or("SEO Analysis");
                let prompt = seo_prompt(self.tone, subject, &email.body, input, user_prompt);
                self.ask(&prompt).await.map(|body| {
                    json!({
                        "email_id": email.id(),
                        "subject": format!("Re: {}", subject),
                        "response_body": body,
                        "suggested_follow_up": "in 1 week for SEO progress check",
                        "status": "success",
                        "original_content": str_field(input, "content").unwrap_or_default(),
                    })
                })
            }
            ContentType::GrammarCheck => {
                let subject = email.subject_or("Grammar Check");
                let prompt = grammar_prompt(self.tone, subject, &email.body, input, user_prompt);
                self.ask(&prompt).await.map(|body| {
                    json!({
                        "email_id": email.id(),
                        "subject": format!("Re: {}", subject),
                        "response_body": body,
                        "suggested_follow_up": null,
                        "status": "success",
                        "original_content": str_field(input, "corrected_text").unwrap_or_default(),
                    })
                })
            }
            ContentType::Generic => None,
        };

        match specific {
            Some(result) => into_payload(result),
            None => self.draft_generic(email, user_prompt).await,
        }
    }

    /// Reply to a plain email: key points first, then the reply itself.
    async fn draft_generic(&self, email: &Email, user_prompt: &str) -> Payload {
        let subject = email.subject_or("No Subject");
        let sender_name = email.reply_name();

        let key_points = self
            .ask(&format!(
                "You are an AI that extracts the 2-3 most important sentences from a text.\n\
                 Return ONLY these sentences, separated by newlines.\n\
                 Do NOT include any introductory or concluding text.\n\n\
                 Email Body:\n{}",
                email.body
            ))
            .await
            .unwrap_or_default();

        let tone_desc = self.tone.email_description();
        let categories = if email.categories.is_empty() {
            "General".to_string()
        } else {
            email.categories.join(", ")
        };
        let prompt = format!(
            "You are an AI assistant that drafts email responses.\n\
             Create a {tone_desc} response.\n\n\
             **Email Details:**\n\
             * Subject: {subject}\n\
             * Sender: {sender_name}\n\
             * Category: {categories}\n\
             * Priority: {priority}\n\n\
             **Key Points to Address (Summarize These):**\n\
             {key_points}\n\n\
             **User's Specific Instructions (If Any):**\n\
             {user_prompt}\n\n\
             **Response Requirements:**\n\
             1. Acknowledge the email.\n\
             2. Briefly address the key points.\n\
             3. Use a {tone_desc} tone.\n\
             4. Include a greeting and sign-off.\n\n\
             Original Email Body:\n\
             {body}\n",
            priority = email.priority_level.as_deref().unwrap_or("medium"),
            body = email.body,
        );

        let follow_up = if email.body.contains('?') {
            json!("in 2 days")
        } else {
            Value::Null
        };
        match self.ask(&prompt).await {
            Some(response) => into_payload(json!({
                "email_id": email.id(),
                "subject": format!("Re: {}", subject),
                "response_body": response,
                "suggested_follow_up": follow_up,
                "status": "success",
                "original_content": email.body,
            })),
            None => self.draft_from_template(email, &sender_name),
        }
    }

    fn draft_from_template(&self, email: &Email, sender_name: &str) -> Payload {
        tracing::info!("[EmailManager] Drafting response from templates");
        let body = &email.body;
        let lower = body.to_lowercase();

        let response_body = if body.contains('?') {
            let mut text = "Thank you for your question. I will look into this and get back to you shortly."
                .to_string();
            if self.tone == ResponseTone::Professional {
                text.push_str("\n\nPlease don't hesitate to contact me if you need further assistance.");
            }
            text
        } else if ["thanks", "thank you", "appreciate"]
            .iter()
            .any(|w| lower.contains(w))
        {
            "You're welcome! Let me know if I can help with anything else.".to_string()
        } else if lower.contains("urgent") || lower.contains("asap") {
            "I've received your urgent request and will prioritize it accordingly.".to_string()
        } else {
            let summary_part = split_sentences(body)
                .into_iter()
                .take(2)
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "Thank you for your email regarding {}. I will review it and respond as needed.",
                summary_part
            )
        };

        let response = format!(
            "{}\n\n{}\n\n{}",
            self.tone.greeting(sender_name),
            response_body,
            self.tone.signoff()
        );

        let follow_up = if body.contains('?') {
            json!("in 2 days")
        } else {
            Value::Null
        };
        into_payload(json!({
            "email_id": email.id(),
            "subject": format!("Re: {}", email.subject_or("No Subject")),
            "response_body": response,
            "suggested_follow_up": follow_up,
            "status": "success",
            "original_content": body,
        }))
    }

    /// One LLM call; failures and blank replies both read as "no answer".
    async fn ask(&self, prompt: &str) -> Option<String> {
        match self.llm.generate(prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!("[EmailManager] LLM returned an empty reply");
                None
            }
            Err(e) => {
                tracing::warn!("[EmailManager] LLM call failed: {}", e);
                None
            }
        }
    }
}

fn synthesize_email(input: &Payload, content_type: ContentType) -> Email {
    match content_type {
        ContentType::MeetingSummary => email_from_meeting(input),
        ContentType::SeoOptimization => email_from_seo(input),
        _ if input.contains_key("content") => Email::synthetic(
            str_field(input, "title").unwrap_or("Content Processing"),
            value_text(input.get("content")),
            "content-processor@example.com",
            "Content Processor",
        ),
        _ if input.contains_key("summary") => Email::synthetic(
            "Content Summary",
            value_text(input.get("summary")),
            "summary@example.com",
            "Summary Generator",
        ),
        _ if input.contains_key("error") && input.contains_key("agent_id") => Email::synthetic(
            "Processed Agent Output",
            value_text(input.get("error")),
            "system@example.com",
            "System",
        ),
        _ => {
            let extracted = extract_text_content(input);
            let body = if extracted.is_empty() {
                Value::Object(input.clone()).to_string()
            } else {
                extracted
            };
            Email::synthetic("Extracted Content", body, "unknown@example.com", "Unknown")
        }
    }
}

fn email_from_meeting(input: &Payload) -> Email {
    let summary = str_field(input, "summary").unwrap_or_default();
    let participants = string_list(input, "participants");

    let subject = match summary.split_once(':') {
        Some((head, _)) if head.chars().count() < 50 => head.trim(),
        _ => "Meeting Summary",
    };
    let participants_text = if participants.is_empty() {
        "No participants listed".to_string()
    } else {
        participants.join(", ")
    };
    let body = format!(
        "Summary:\n{}\n\nParticipants: {}\n\nAction Items:\n{}",
        summary,
        participants_text,
        format_action_items(input, "")
    );

    Email::synthetic(
        subject,
        body,
        "meeting-summary@company.com",
        participants.first().map(String::as_str).unwrap_or("Team Member"),
    )
}

fn email_from_seo(input: &Payload) -> Email {
    let content = str_field(input, "content").unwrap_or_default();
    let preview: String = content.chars().take(300).collect();
    let keywords = string_list(input, "keywords");
    let keywords_text = if keywords.is_empty() {
        "No specific keywords.".to_string()
    } else {
        keywords.join(", ")
    };

    let body = format!(
        "SEO Analysis Results\n\nSEO Score: {}/100\n\nTarget Keywords: {}\n\nRecommendations:\n{}\n\nAnalyzed Content:\n{}...",
        seo_score_text(input),
        keywords_text,
        format_recommendations(input),
        preview
    );
    Email::synthetic("SEO Optimization Results", body, "seo-analyzer@company.com", "SEO Analyzer")
}

/// `"{i}. {task} ({label}{assignee})"` lines, empty when there are none.
fn format_action_items(input: &Payload, assignee_label: &str) -> String {
    input
        .get("action_items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let task = item
                        .get("task")
                        .map(|t| value_text(Some(t)))
                        .unwrap_or_default();
                    let assignee = item
                        .get("assignee")
                        .and_then(Value::as_str)
                        .filter(|a| !a.is_empty())
                        .unwrap_or("Unassigned");
                    format!("{}. {} ({}{})", i + 1, task, assignee_label, assignee)
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn format_recommendations(input: &Payload) -> String {
    let recommendations = string_list(input, "recommendations");
    if recommendations.is_empty() {
        "No specific recommendations.".to_string()
    } else {
        recommendations
            .iter()
            .map(|r| format!("- {}", r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn seo_score_text(input: &Payload) -> String {
    match input.get("seo_score") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "0".to_string(),
    }
}

fn meeting_prompt(
    tone: ResponseTone,
    subject: &str,
    body: &str,
    input: &Payload,
    user_prompt: &str,
) -> String {
    let tone_desc = tone.content_description();
    let mut action_items = format_action_items(input, "Assigned to: ");
    if action_items.is_empty() {
        action_items = "No action items.".to_string();
    }
    let participants = string_list(input, "participants");
    let participants = if participants.is_empty() {
        "No participants listed.".to_string()
    } else {
        participants.join(", ")
    };

    format!(
        "You are an AI assistant drafting a {tone_desc} email response to a meeting summary.\n\n\
         **Meeting Details:**\n\
         * Subject: {subject}\n\
         * Participants: {participants}\n\
         * Action Items: {action_items}\n\n\
         **User's Specific Instructions (If Any):**\n\
         {user_prompt}\n\n\
         **Response Requirements:**\n\
         1. Acknowledge receipt of the summary.\n\
         2. Briefly recap 1-2 key discussion points.\n\
         3. Highlight any urgent action items.\n\
         4. Suggest a follow-up action (e.g., schedule another meeting, send update).\n\
         5. Use a {tone_desc} tone.\n\
         6. Include a professional greeting and sign-off.\n\n\
         Meeting Summary:\n\
         {body}\n"
    )
}

fn seo_prompt(
    tone: ResponseTone,
    subject: &str,
    body: &str,
    input: &Payload,
    user_prompt: &str,
) -> String {
    let tone_desc = tone.content_description();
    let keywords = string_list(input, "keywords");
    let keywords = if keywords.is_empty() {
        "None specified".to_string()
    } else {
        keywords.join(", ")
    };

    format!(
        "You are an AI assistant drafting a {tone_desc} email response to SEO optimization results.\n\n\
         **SEO Analysis Details:**\n\
         * Subject: {subject}\n\
         * SEO Score: {score}/100\n\
         * Target Keywords: {keywords}\n\n\
         **SEO Recommendations:**\n\
         {recommendations}\n\n\
         **User's Specific Instructions (If Any):**\n\
         {user_prompt}\n\n\
         **Response Requirements:**\n\
         1. Acknowledge the SEO analysis results.\n\
         2. Highlight the most important 2-3 recommendations.\n\
         3. Suggest next steps for implementation.\n\
         4. Use a {tone_desc} tone.\n\
         5. Include a professional greeting and sign-off.\n\n\
         Original Content:\n\
         {body}\n",
        score = seo_score_text(input),
        recommendations = format_recommendations(input),
    )
}

fn grammar_prompt(
    tone: ResponseTone,
    subject: &str,
    body: &str,
    input: &Payload,
    user_prompt: &str,
) -> String {
    let tone_desc = tone.content_description();
    let issues: Vec<String> = input
        .get("grammar_issues")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|i| value_text(Some(i))).collect())
        .unwrap_or_default();
    let issues_text = if issues.is_empty() {
        "No major grammar issues found.".to_string()
    } else {
        issues
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an AI assistant drafting a {tone_desc} email response to grammar check results.\n\n\
         **Grammar Check Details:**\n\
         * Subject: {subject}\n\
         * Number of Issues: {count}\n\n\
         **Grammar Issues Identified:**\n\
         {issues_text}\n\n\
         **User's Specific Instructions (If Any):**\n\
         {user_prompt}\n\n\
         **Response Requirements:**\n\
         1. Acknowledge the grammar check results.\n\
         2. Briefly mention the most important improvements.\n\
         3. Provide any relevant writing tips.\n\
         4. Use a {tone_desc} tone.\n\
         5. Include a professional greeting and sign-off.\n\n\
         Original Content:\n\
         {body}\n",
        count = issues.len(),
    )
}

/// Strings as-is, everything else as compact JSON.
fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Split after `.` or `?` followed by whitespace, leaving abbreviations such
/// as "Mr." and "e.g." intact.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 0..chars.len() {
        if !matches!(chars[i], '.' | '?') || i + 1 >= chars.len() || !chars[i + 1].is_whitespace() {
            continue;
        }
        let title_abbrev = i >= 2
            && chars[i] == '.'
            && chars[i - 2].is_uppercase()
            && chars[i - 1].is_lowercase();
        let dotted_abbrev = i >= 3
            && chars[i - 2] == '.'
            && chars[i - 3].is_alphanumeric()
            && chars[i - 1].is_alphanumeric();
        if title_abbrev || dotted_abbrev {
            continue;
        }
        sentences.push(chars[start..=i].iter().collect::<String>());
        start = i + 2;
    }
    if start < chars.len() {
        sentences.push(chars[start..].iter().collect());
    }
    sentences
}

/// Keyword-bag categories plus internal/external by sender domain.
fn categorize(email: &Email) -> Payload {
    let mut categories = vec![if email.sender.contains("@ourcompany.com") {
        "internal"
    } else {
        "external"
    }];

    let content = format!("{} {}", email.subject_or(""), email.body).to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| content.contains(k)) {
            categories.push(category);
        }
    }
    if categories.len() == 1 {
        categories.push("general");
    }

    into_payload(json!({
        "email_id": email.id(),
        "categories": categories,
        "categorization_confidence": 0.85,
        "status": "success",
    }))
}

/// Additive urgency score from base 50. The score is not capped.
fn prioritize(email: &Email) -> Payload {
    let subject = email.subject_or("").to_lowercase();
    let body = email.body.to_lowercase();
    let urgent_in = |text: &str| URGENCY_KEYWORDS.iter().any(|k| text.contains(k));

    let mut score: i64 = 50;
    if urgent_in(&subject) {
        score += 20;
    }
    if urgent_in(&body) {
        score += 10;
    }
    if VIP_DOMAINS.iter().any(|d| email.sender.contains(d)) {
        score += 15;
    }
    if TIME_WORDS.iter().any(|w| body.contains(w)) {
        score += 10;
    }
    if body.contains('?') {
        score += 5;
    }

    let level = match score {
        s if s >= 80 => "urgent",
        s if s >= 60 => "high",
        s if s >= 40 => "medium",
        _ => "low",
    };

    into_payload(json!({
        "email_id": email.id(),
        "priority_score": score,
        "priority_level": level,
        "time_sensitive": score >= 70,
        "needs_response": body.contains('?') || urgent_in(&body),
        "status": "success",
    }))
}

#[async_trait]
impl Agent for EmailManager {
    fn name(&self) -> &str {
        AgentKind::EmailManager.display_name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::EmailManager
    }

    fn input_schema(&self) -> SchemaSpec {
        let string = || PropertySpec::of(SchemaType::String);
        SchemaSpec::object()
            .property(
                "email",
                PropertySpec::of(SchemaType::Object)
                    .with_property("id", string())
                    .with_property("subject", string())
                    .with_property("body", string())
                    .with_property("sender", string())
                    .with_property("sender_name", string())
                    .with_property("received_time", string().with_format("date-time")),
            )
            .property("content", string().describe("Main content to process if no email object"))
            .property("summary", string().describe("Summary text from previous agent"))
            .property(
                "action_items",
                PropertySpec::of(SchemaType::Array).describe("Action items from meeting summarizer"),
            )
            .property("transcript", string().describe("Meeting transcript from previous agent"))
            .property(
                "participants",
                PropertySpec::of(SchemaType::Array).describe("Meeting participants from previous agent"),
            )
            .property(
                "categories",
                PropertySpec::of(SchemaType::Array)
                    .with_items(string())
                    .describe("Categories of email from previous agent"),
            )
            .property(
                "priority_level",
                string().describe("Email priority level from previous agent"),
            )
    }

    fn output_schema(&self) -> SchemaSpec {
        let string = || PropertySpec::of(SchemaType::String);
        match EmailMode::from_str(&self.mode) {
            Some(EmailMode::Categorize) => SchemaSpec::object()
                .property("email_id", string())
                .property("categories", PropertySpec::of(SchemaType::Array).with_items(string()))
                .property("categorization_confidence", PropertySpec::of(SchemaType::Number))
                .property("status", string()),
            Some(EmailMode::Prioritize) => SchemaSpec::object()
                .property("email_id", string())
                .property("priority_score", PropertySpec::of(SchemaType::Number))
                .property("priority_level", string())
                .property("time_sensitive", PropertySpec::of(SchemaType::Boolean))
                .property("needs_response", PropertySpec::of(SchemaType::Boolean))
                .property("status", string()),
            Some(EmailMode::DraftResponse) => SchemaSpec::object()
                .property("email_id", string())
                .property("subject", string())
                .property("response_body", string())
                .property(
                    "suggested_follow_up",
                    PropertySpec::one_of(&[SchemaType::String, SchemaType::Null]),
                )
                .property("status", string()),
            None => SchemaSpec::object(),
        }
    }

    fn config_schema(&self) -> SchemaSpec {
        SchemaSpec::object()
            .property(
                "mode",
                PropertySpec::of(SchemaType::String)
                    .with_enum(&["categorize", "prioritize", "draft_response"])
                    .describe("Operation mode for the email manager"),
            )
            .property(
                "response_tone",
                PropertySpec::of(SchemaType::String)
                    .with_enum(&["professional", "friendly", "concise"])
                    .describe("Tone to use for email responses"),
            )
    }

    async fn process(
        &mut self,
        input: Payload,
        context: Option<&ExecutionContext>,
    ) -> Result<Payload, AgentError> {
        self.published.clear();
        let content_type = ContentType::detect(&input);
        tracing::info!(
            "[EmailManager] Processing (mode={}, content_type={:?})",
            self.mode,
            content_type
        );

        let email = Self::resolve_email(&input, content_type);
        let user_prompt = context.map(|c| c.original_prompt()).unwrap_or_default();

        let result = match EmailMode::from_str(&self.mode) {
            Some(EmailMode::Categorize) => categorize(&email),
            Some(EmailMode::Prioritize) => prioritize(&email),
            Some(EmailMode::DraftResponse) => {
                self.draft_for_content(&email, &input, content_type, user_prompt)
                    .await
            }
            None => into_payload(json!({
                "error": format!("Unknown mode: {}", self.mode),
                "status": "failed",
            })),
        };

        if let Some(body) = result.get("response_body").and_then(Value::as_str) {
            self.published.push(knowledge_item(
                "email_templates",
                body.to_string(),
                &[
                    ("type", "email_response"),
                    ("tone", self.tone.as_str()),
                    ("subject", email.subject_or("No Subject")),
                ],
            ));
        }

        Ok(result)
    }

    fn published_knowledge(&self) -> Vec<KnowledgeItem> {
        self.published.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn payload(value: Value) -> Payload {
        into_payload(value)
    }

    fn manager(llm: MockLlmClient, mode: &str, tone: &str) -> EmailManager {
        let config = payload(json!({ "mode": mode, "response_tone": tone }));
        EmailManager::new(Arc::new(llm), &config)
    }

    fn email_input(subject: &str, body: &str, sender: &str) -> Payload {
        payload(json!({
            "email": { "id": "e-1", "subject": subject, "body": body, "sender": sender }
        }))
    }

    #[test]
    fn test_detect_content_type() {
        let meeting = payload(json!({ "summary": "s", "participants": [] }));
        assert_eq!(ContentType::detect(&meeting), ContentType::MeetingSummary);
        let seo = payload(json!({ "recommendations": [], "seo_score": 60 }));
        assert_eq!(ContentType::detect(&seo), ContentType::SeoOptimization);
        let grammar = payload(json!({ "corrected_text": "x", "grammar_issues": [] }));
        assert_eq!(ContentType::detect(&grammar), ContentType::GrammarCheck);
        let plain = payload(json!({ "summary": "only" }));
        assert_eq!(ContentType::detect(&plain), ContentType::Generic);
    }

    #[tokio::test]
    async fn test_categorize_keyword_bags() {
        let mut agent = manager(MockLlmClient::unavailable(), "categorize", "professional");
        let out = agent
            .process(
                email_input("Invoice question", "Our payment failed with an error", "a@ourcompany.com"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(out["categories"], json!(["internal", "support", "finance"]));
        assert_eq!(out["categorization_confidence"], 0.85);
        assert_eq!(out["email_id"], "e-1");

        let out = agent
            .process(email_input("Hello", "Nice to meet you", "x@elsewhere.org"), None)
            .await
            .unwrap();
        assert_eq!(out["categories"], json!(["external", "general"]));
    }

    #[tokio::test]
    async fn test_prioritize_scores() {
        let llm = MockLlmClient::unavailable();
        let mut agent = manager(llm, "prioritize", "professional");

        let out = agent
            .process(email_input("URGENT: server", "The server is down.", "ops@example.com"), None)
            .await
            .unwrap();
        assert_eq!(out["priority_score"], 70);
        assert_eq!(out["priority_level"], "high");
        assert_eq!(out["time_sensitive"], true);
        assert_eq!(out["needs_response"], false);

        let out = agent
            .process(
                email_input(
                    "Urgent contract",
                    "This is critical, can you reply today?",
                    "ceo@bigcustomer.com",
                ),
                None,
            )
            .await
            .unwrap();
        assert_eq!(out["priority_score"], 110);
        assert_eq!(out["priority_level"], "urgent");
        assert_eq!(out["needs_response"], true);
    }

    #[tokio::test]
    async fn test_unknown_mode() {
        let mut agent = manager(MockLlmClient::unavailable(), "archive", "professional");
        let out = agent.process(Payload::new(), None).await.unwrap();
        assert_eq!(out["error"], "Unknown mode: archive");
        assert_eq!(out["status"], "failed");
    }

    #[tokio::test]
    async fn test_draft_meeting_reply_uses_llm() {
        let llm = MockLlmClient::new("generic").with_reply(
            "response to a meeting summary",
            "Dear team, thanks for the summary.",
        );
        let mut agent = manager(llm, "draft_response", "friendly");
        let input = payload(json!({
            "summary": "Timeline review: testing needs two weeks.",
            "participants": ["John", "Jane"],
            "action_items": [{ "task": "Plan testing", "assignee": "Jane", "status": "pending" }],
        }));

        let out = agent.process(input, None).await.unwrap();
        assert_eq!(out["subject"], "Re: Timeline review");
        assert_eq!(out["response_body"], "Dear team, thanks for the summary.");
        assert_eq!(out["suggested_follow_up"], "in 1 day");
        assert_eq!(out["original_content"], "Timeline review: testing needs two weeks.");

        let knowledge = agent.published_knowledge();
        assert_eq!(knowledge.len(), 1);
        assert_eq!(knowledge[0].collection, "email_templates");
        assert_eq!(knowledge[0].metadata["tone"], "friendly");
        assert_eq!(knowledge[0].metadata["subject"], "Timeline review");
    }

    #[tokio::test]
    async fn test_draft_falls_back_to_template() {
        let mut agent = manager(MockLlmClient::unavailable(), "draft_response", "professional");
        let out = agent
            .process(
                payload(json!({
                    "email": { "subject": "Access", "body": "Can you reset my password?", "sender_name": "Ann" }
                })),
                None,
            )
            .await
            .unwrap();

        let body = out["response_body"].as_str().unwrap();
        assert!(body.starts_with("Dear Ann,\n\nThank you for your question."));
        assert!(body.contains("Please don't hesitate to contact me"));
        assert!(body.ends_with("Best regards,\n[Your Name]"));
        assert_eq!(out["subject"], "Re: Access");
        assert_eq!(out["email_id"], "unknown");
        assert_eq!(out["suggested_follow_up"], "in 2 days");
    }

    #[tokio::test]
    async fn test_empty_llm_reply_uses_template() {
        let mut agent = manager(MockLlmClient::new("   "), "draft_response", "concise");
        let out = agent
            .process(
                payload(json!({ "content": "Thanks for the update. Talk soon." })),
                None,
            )
            .await
            .unwrap();
        let body = out["response_body"].as_str().unwrap();
        assert!(body.starts_with("Hi Content Processor,"));
        assert!(body.contains("You're welcome!"));
        assert!(body.ends_with("Regards,\n[Your Name]"));
        assert_eq!(out["subject"], "Re: Content Processing");
    }

    #[test]
    fn test_split_sentences_keeps_abbreviations() {
        let parts = split_sentences("Mr. Smith called. He asked e.g. about pricing. Done");
        assert_eq!(parts[0], "Mr. Smith called.");
        assert_eq!(parts[1], "He asked e.g. about pricing.");
        assert_eq!(parts[2], "Done");
    }

    #[test]
    fn test_synthesized_seo_email() {
        let input = payload(json!({
            "content": "Rust makes systems programming approachable.",
            "keywords": ["rust"],
            "recommendations": ["Use descriptive titles."],
            "seo_score": 65,
        }));
        let email = synthesize_email(&input, ContentType::detect(&input));
        assert_eq!(email.subject.as_deref(), Some("SEO Optimization Results"));
        assert!(email.body.contains("SEO Score: 65/100"));
        assert!(email.body.contains("- Use descriptive titles."));
        assert_eq!(email.sender, "seo-analyzer@company.com");
    }
}
