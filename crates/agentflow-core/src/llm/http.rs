//! HTTP-backed LLM client.
//!
//! Supported wire formats:
//! - Gemini `generateContent`:
//!   `POST {base_url}/models/{model}:generateContent?key={api_key}`
//! - Anthropic Messages API:
//!   `POST {base_url}/v1/messages` with `x-api-key` and `anthropic-version`
//! - OpenAI-compatible chat completions:
//!   `POST {base_url}/chat/completions` with a bearer token

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{LlmClient, LlmError};
use crate::config::{LlmConfig, LlmProvider};

pub struct HttpLlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.provider == LlmProvider::Mock {
            return Err(LlmError::Config(
                "mock provider has no HTTP backend".to_string(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config(format!(
                "No API key configured for provider '{}'",
                config.provider.as_str()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn call_gemini(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let mut generation_config = json!({ "maxOutputTokens": self.config.max_tokens });
        if let Some(temp) = self.config.temperature {
            generation_config["temperature"] = json!(temp);
        }
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        tracing::info!("[LlmClient] Calling Gemini API: {} (model: {})", url, model);

        let request = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body);
        let json = self.send(request).await?;
        non_empty(extract_gemini_text(&json))
    }

    async fn call_anthropic(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        let mut body = json!({
            "model": model,
            "max_tokens": self.config.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }

        tracing::info!("[LlmClient] Calling Anthropic API: {} (model: {})", url, model);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body);
        let json = self.send(request).await?;
        non_empty(extract_anthropic_text(&json))
    }

    async fn call_openai(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut body = json!({
            "model": model,
            "max_tokens": self.config.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }

        tracing::info!("[LlmClient] Calling OpenAI-compatible API: {} (model: {})", url, model);

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&body);
        let json = self.send(request).await?;
        non_empty(extract_openai_text(&json))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, LlmError> {
        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::Request(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            tracing::warn!("[LlmClient] API returned {}", status);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        serde_json::from_str(&response_text)
            .map_err(|e| LlmError::Request(format!("Failed to parse response JSON: {}", e)))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate_with_model(prompt, None).await
    }

    async fn generate_with_model(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, LlmError> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.config.model);
        match self.config.provider {
            LlmProvider::Gemini => self.call_gemini(prompt, model).await,
            LlmProvider::Anthropic => self.call_anthropic(prompt, model).await,
            LlmProvider::OpenAi => self.call_openai(prompt, model).await,
            LlmProvider::Mock => Err(LlmError::Unavailable("mock provider".to_string())),
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn non_empty(text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        Err(LlmError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// `candidates[0].content.parts[*].text`, newline-joined.
fn extract_gemini_text(json: &Value) -> String {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Text blocks of an Anthropic `content` array, newline-joined.
fn extract_anthropic_text(json: &Value) -> String {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|arr| {
            arr.iter()
                .filter_map(|block| {
                    if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                        block.get("text").and_then(|t| t.as_str()).map(|s| s.to_string())
                    } else {
                        None
                    }
                })
                .reduce(|a, b| format!("{}\n{}", a, b))
        })
        .unwrap_or_default()
}

fn extract_openai_text(json: &Value) -> String {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider, key: &str) -> LlmConfig {
        LlmConfig {
            provider,
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: key.to_string(),
            model: "test-model".to_string(),
            temperature: None,
            max_tokens: 16,
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = HttpLlmClient::new(&config(LlmProvider::Gemini, "  ")).err().unwrap();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn test_extract_response_text() {
        let gemini = json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        });
        assert_eq!(extract_gemini_text(&gemini), "a\nb");

        let anthropic = json!({
            "content": [
                { "type": "thinking", "thinking": "hmm" },
                { "type": "text", "text": "hello" }
            ]
        });
        assert_eq!(extract_anthropic_text(&anthropic), "hello");

        let openai = json!({ "choices": [{ "message": { "content": "hi there" } }] });
        assert_eq!(extract_openai_text(&openai), "hi there");

        assert_eq!(extract_openai_text(&json!({})), "");
        assert!(matches!(non_empty("  ".to_string()), Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let client = HttpLlmClient::new(&config(LlmProvider::OpenAi, "k")).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
        assert_eq!(client.model(), "test-model");
    }
}
