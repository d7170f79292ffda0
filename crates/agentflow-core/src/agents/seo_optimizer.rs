//! SEO optimizer: keyword analysis, retrieved best practices and a bounded score.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::text::{extract_text_content, string_list};
use super::{config_str, Agent};
use crate::error::AgentError;
use crate::knowledge::KnowledgeStore;
use crate::models::{AgentKind, ExecutionContext, Payload};
use crate::schema::{PropertySpec, SchemaSpec, SchemaType};

const MAX_KEYWORDS: usize = 5;

const SEO_BEST_PRACTICES: [&str; 15] = [
    "Use descriptive titles with primary keywords under 60 characters.",
    "Create meta descriptions between 150-160 characters with a call to action.",
    "Structure content with H1, H2, and H3 tags in hierarchical order.",
    "Optimize images with descriptive filenames and alt text.",
    "Ensure responsive design for mobile optimization.",
    "Improve page loading speed by optimizing image sizes and leveraging browser caching.",
    "Create high-quality, original content of at least 300 words per page.",
    "Include relevant internal and external links with descriptive anchor text.",
    "Use canonical tags to prevent duplicate content issues.",
    "Create a logical site structure with breadcrumb navigation.",
    "Implement schema markup for rich snippets in search results.",
    "Ensure proper URL structure with keywords and logical hierarchy.",
    "Create an XML sitemap and submit to search engines.",
    "Use 301 redirects for changed or moved pages.",
    "Set up Google Analytics and Google Search Console for monitoring.",
];

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordFinding {
    pub count: usize,
    pub density: f64,
    pub in_first_paragraph: bool,
}

pub struct SeoOptimizer {
    knowledge: Arc<dyn KnowledgeStore>,
    collection: String,
}

impl SeoOptimizer {
    pub fn new(knowledge: Arc<dyn KnowledgeStore>, config: &Payload) -> Self {
        Self {
            knowledge,
            collection: config_str(config, "collection_name", "seo_knowledge"),
        }
    }

    /// Seed the canned best practices the first time the collection is empty.
    async fn ensure_knowledge(&self) {
        if self.knowledge.collection_len(&self.collection).await > 0 {
            return;
        }
        tracing::info!(
            "[SeoOptimizer] Seeding {} best practices into {}",
            SEO_BEST_PRACTICES.len(),
            self.collection
        );
        let mut metadata = Payload::new();
        metadata.insert("type".into(), json!("seo_best_practice"));
        self.knowledge
            .add_documents(
                &self.collection,
                SEO_BEST_PRACTICES.iter().map(|d| d.to_string()).collect(),
                vec![metadata; SEO_BEST_PRACTICES.len()],
                Some((0..SEO_BEST_PRACTICES.len()).map(|i| format!("seo_{}", i)).collect()),
            )
            .await;
    }
}

/// The first non-empty keyword source wins: explicit list, email subject
/// words, participant names, then words of the user's prompt. Repeats are
/// dropped, keeping the first occurrence.
pub fn target_keywords(input: &Payload, prompt: &str) -> Vec<String> {
    let long_words = |text: &str| -> Vec<String> {
        text.split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .map(str::to_string)
            .collect()
    };

    let mut keywords = string_list(input, "keywords");
    if keywords.is_empty() {
        if let Some(subject) = input
            .get("email")
            .and_then(|e| e.get("subject"))
            .and_then(Value::as_str)
        {
            keywords = long_words(subject);
        }
    }
    if keywords.is_empty() {
        keywords = string_list(input, "participants")
            .into_iter()
            .filter(|p| p.chars().count() > 3)
            .collect();
    }
    if keywords.is_empty() {
        keywords = long_words(prompt);
    }

    let mut seen = std::collections::HashSet::new();
    keywords.retain(|k| seen.insert(k.clone()));
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

pub fn analyze_keyword(content: &str, keyword: &str) -> KeywordFinding {
    let content_lower = content.to_lowercase();
    let keyword_lower = keyword.to_lowercase();

    let count = if keyword_lower.is_empty() {
        0
    } else {
        content_lower.matches(&keyword_lower).count()
    };
    let words = content.split_whitespace().count().max(1) as f64;
    let keyword_words = keyword.split_whitespace().count() as f64;
    let density = ((count as f64 * keyword_words) / words * 100.0 * 100.0).round() / 100.0;

    let in_first_paragraph = match content_lower.split_once("\n\n") {
        Some((first, _)) => first.contains(&keyword_lower),
        None => content_lower
            .chars()
            .take(200)
            .collect::<String>()
            .contains(&keyword_lower),
    };

    KeywordFinding {
        count,
        density,
        in_first_paragraph,
    }
}

/// Base 50, adjusted per keyword and for content length, clamped to `[0, 100]`.
pub fn seo_score(findings: &[KeywordFinding], content: &str) -> i64 {
    let mut score: i64 = 50;
    for finding in findings {
        if finding.count > 0 {
            score += 5;
        }
        if finding.in_first_paragraph {
            score += 5;
        }
        if (0.5..=2.5).contains(&finding.density) {
            score += 5;
        } else if finding.density > 2.5 {
            score -= 5;
        }
    }
    if content.split_whitespace().count() > 300 {
        score += 10;
    }
    score.clamp(0, 100)
}

#[async_trait]
impl Agent for SeoOptimizer {
    fn name(&self) -> &str {
        AgentKind::SeoOptimizer.display_name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::SeoOptimizer
    }

    fn input_schema(&self) -> SchemaSpec {
        let string = || PropertySpec::of(SchemaType::String);
        SchemaSpec::object()
            .property("content", string().describe("The content to analyze for SEO"))
            .property(
                "keywords",
                PropertySpec::of(SchemaType::Array)
                    .with_items(string())
                    .describe("Target keywords for SEO optimization"),
            )
            .property("summary", string().describe("Summary from a previous agent"))
            .property(
                "email",
                PropertySpec::of(SchemaType::Object).describe("Email containing content in body field"),
            )
            .property("transcript", string().describe("Meeting transcript from previous agent"))
    }

    fn output_schema(&self) -> SchemaSpec {
        SchemaSpec::object()
            .property(
                "keyword_analysis",
                PropertySpec::of(SchemaType::Object).describe("Analysis of keyword usage in content"),
            )
            .property(
                "recommendations",
                PropertySpec::of(SchemaType::Array)
                    .with_items(PropertySpec::of(SchemaType::String))
                    .describe("SEO recommendations based on content analysis"),
            )
            .property(
                "seo_score",
                PropertySpec::of(SchemaType::Number).describe("Overall SEO score from 0-100"),
            )
    }

    fn config_schema(&self) -> SchemaSpec {
        SchemaSpec::object().property(
            "collection_name",
            PropertySpec::of(SchemaType::String)
                .describe("Name of the knowledge collection for SEO best practices")
                .with_default(json!("seo_knowledge")),
        )
    }

    async fn process(
        &mut self,
        input: Payload,
        context: Option<&ExecutionContext>,
    ) -> Result<Payload, AgentError> {
        self.ensure_knowledge().await;

        let content = extract_text_content(&input);
        let prompt = context.map(|c| c.original_prompt()).unwrap_or_default();
        let keywords = target_keywords(&input, prompt);

        let mut analysis = Payload::new();
        let mut findings = Vec::with_capacity(keywords.len());
        for keyword in &keywords {
            let finding = analyze_keyword(&content, keyword);
            analysis.insert(
                keyword.clone(),
                json!({
                    "count": finding.count,
                    "density": finding.density,
                    "in_first_paragraph": finding.in_first_paragraph,
                }),
            );
            findings.push(finding);
        }

        let recommendations: Vec<String> = self
            .knowledge
            .search(&self.collection, &content, 5)
            .await
            .into_iter()
            .map(|hit| hit.document)
            .collect();

        let score = seo_score(&findings, &content);
        tracing::info!(
            "[SeoOptimizer] Analyzed {} keyword(s), score {}",
            keywords.len(),
            score
        );

        let mut out = Payload::new();
        out.insert("content".into(), json!(content));
        out.insert("keywords".into(), json!(keywords));
        out.insert("keyword_analysis".into(), Value::Object(analysis));
        out.insert("recommendations".into(), json!(recommendations));
        out.insert("seo_score".into(), json!(score));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::InMemoryKnowledgeStore;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_keyword_sources_in_order() {
        let explicit = payload(json!({ "keywords": ["rust"], "email": { "subject": "Quarterly results" } }));
        assert_eq!(target_keywords(&explicit, ""), vec!["rust"]);

        let subject = payload(json!({ "email": { "subject": "Our new product launch" } }));
        assert_eq!(target_keywords(&subject, ""), vec!["product", "launch"]);

        let people = payload(json!({ "participants": ["Bob", "Alice", "Jonathan"] }));
        assert_eq!(target_keywords(&people, ""), vec!["Alice", "Jonathan"]);

        let prompt = "optimize this blog post about async rust runtimes and their schedulers today";
        let words = target_keywords(&Payload::new(), prompt);
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], "optimize");
    }

    #[test]
    fn test_keyword_analysis() {
        let content = "Rust is fast.\n\nMany teams pick rust for services.";
        let finding = analyze_keyword(content, "Rust");
        assert_eq!(finding.count, 2);
        assert!(finding.in_first_paragraph);
        assert_eq!(finding.density, 22.22);

        let finding = analyze_keyword("no paragraphs here", "here");
        assert!(finding.in_first_paragraph);
    }

    #[test]
    fn test_score_rewards_then_penalizes_density() {
        let filler = "word ".repeat(200);
        let compliant = KeywordFinding {
            count: 2,
            density: 1.0,
            in_first_paragraph: true,
        };
        assert_eq!(seo_score(&[compliant.clone()], &filler), 65);

        let stuffed = KeywordFinding {
            density: 3.0,
            ..compliant
        };
        assert_eq!(seo_score(&[stuffed], &filler), 55);

        let long = "word ".repeat(301);
        assert_eq!(seo_score(&[], &long), 60);
    }

    #[test]
    fn test_score_is_clamped() {
        let great = KeywordFinding {
            count: 1,
            density: 1.0,
            in_first_paragraph: true,
        };
        let findings = vec![great; 5];
        assert_eq!(seo_score(&findings, &"w ".repeat(400)), 100);
    }

    #[tokio::test]
    async fn test_process_seeds_and_recommends() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let mut agent = SeoOptimizer::new(store.clone(), &Payload::new());

        let input = payload(json!({
            "content": "Optimize images and page loading speed for mobile users.",
            "keywords": ["images", "speed"],
        }));
        let out = agent.process(input, None).await.unwrap();

        assert_eq!(store.collection_len("seo_knowledge").await, 15);
        assert_eq!(out["recommendations"].as_array().unwrap().len(), 5);
        assert_eq!(out["keywords"], json!(["images", "speed"]));
        assert_eq!(out["keyword_analysis"]["images"]["count"], 1);
        let score = out["seo_score"].as_i64().unwrap();
        assert!((0..=100).contains(&score));

        // A second run must not seed again.
        let mut again = SeoOptimizer::new(store.clone(), &Payload::new());
        again.process(Payload::new(), None).await.unwrap();
        assert_eq!(store.collection_len("seo_knowledge").await, 15);
    }

    #[test]
    fn test_repeated_keywords_collapse() {
        let input = payload(json!({ "keywords": ["rust", "code", "rust", "tokio", "code"] }));
        assert_eq!(target_keywords(&input, ""), vec!["rust", "code", "tokio"]);

        let prompt = "review review review these async async changes";
        assert_eq!(target_keywords(&Payload::new(), prompt), vec!["review", "these", "async", "changes"]);
    }

    #[tokio::test]
    async fn test_repeated_keyword_scores_once() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let content = "Rust is great. I like writing code in it every single day.";

        let mut agent = SeoOptimizer::new(store.clone(), &Payload::new());
        let once = agent
            .process(payload(json!({ "content": content, "keywords": ["rust"] })), None)
            .await
            .unwrap();
        let twice = agent
            .process(payload(json!({ "content": content, "keywords": ["rust", "rust"] })), None)
            .await
            .unwrap();

        assert_eq!(twice["seo_score"], once["seo_score"]);
        assert_eq!(twice["keywords"], json!(["rust"]));
        assert_eq!(twice["keyword_analysis"].as_object().unwrap().len(), 1);
    }
}
