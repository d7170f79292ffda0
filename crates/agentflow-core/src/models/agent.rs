use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::SchemaSpec;

/// The concrete agent variant a catalog record constructs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    SeoOptimizer,
    MeetingSummarizer,
    EmailManager,
    GrammarChecker,
    MeetingScheduler,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        Self::SeoOptimizer,
        Self::MeetingSummarizer,
        Self::EmailManager,
        Self::GrammarChecker,
        Self::MeetingScheduler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeoOptimizer => "seo_optimizer",
            Self::MeetingSummarizer => "meeting_summarizer",
            Self::EmailManager => "email_manager",
            Self::GrammarChecker => "grammar_checker",
            Self::MeetingScheduler => "meeting_scheduler",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "seo_optimizer" => Some(Self::SeoOptimizer),
            "meeting_summarizer" => Some(Self::MeetingSummarizer),
            "email_manager" => Some(Self::EmailManager),
            "grammar_checker" => Some(Self::GrammarChecker),
            "meeting_scheduler" => Some(Self::MeetingScheduler),
            _ => None,
        }
    }

    /// Display name used for the built-in catalog entry.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SeoOptimizer => "SEO Optimizer",
            Self::MeetingSummarizer => "Meeting Summarizer",
            Self::EmailManager => "Smart Email Manager",
            Self::GrammarChecker => "Grammar and Style Checker",
            Self::MeetingScheduler => "Zoom Meeting Scheduler",
        }
    }
}

/// A catalog record describing an agent and how to construct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub kind: AgentKind,
    pub input_schema: SchemaSpec,
    pub output_schema: SchemaSpec,
    pub config_schema: SchemaSpec,
    pub created_at: DateTime<Utc>,
}
