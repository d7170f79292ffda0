//! Zoom meeting scheduler.
//!
//! The only agent with an external side effect. Its output is the input
//! passed through plus either `meeting_info` or `error`; what it did is
//! reported separately through [`Agent::side_effect`].

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

use super::{config_str, Agent};
use crate::config::SchedulerConfig;
use crate::error::{AgentError, FlowError};
use crate::models::{AgentKind, ExecutionContext, Payload, SideEffectRecord};
use crate::schema::{PropertySpec, SchemaSpec, SchemaType};

const TOKEN_TTL_SECS: i64 = 3600;

pub struct MeetingScheduler {
    http: reqwest::Client,
    api_key: String,
    api_secret: String,
    base_url: String,
    user_id: String,
    last_effect: Option<SideEffectRecord>,
}

impl MeetingScheduler {
    pub fn new(
        settings: &SchedulerConfig,
        http: reqwest::Client,
        config: &Payload,
    ) -> Result<Self, FlowError> {
        let (Some(api_key), Some(api_secret)) = (&settings.api_key, &settings.api_secret) else {
            return Err(FlowError::Config(
                "ZOOM_API_KEY and ZOOM_API_SECRET must be set".to_string(),
            ));
        };
        let user_id = config_str(config, "user_id", &settings.user_id);
        tracing::info!("[MeetingScheduler] Initialized (user_id={})", user_id);

        Ok(Self {
            http,
            api_key: api_key.clone(),
            api_secret: api_secret.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_id,
            last_effect: None,
        })
    }

    /// HS256-signed bearer token valid for one hour.
    fn generate_token(&self, now_secs: i64) -> Result<String, AgentError> {
        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let claims = json!({ "iss": self.api_key, "exp": now_secs + TOKEN_TTL_SECS });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| AgentError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    fn meeting_request(input: &Payload) -> Value {
        let text = |key: &str, default: &str| {
            input
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let duration = match input.get("meeting_duration") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .unwrap_or(60),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(60),
            _ => 60,
        };

        json!({
            "topic": text("meeting_topic", "My Meeting"),
            "type": 2,
            "start_time": text("meeting_start_time", "2024-12-31T12:00:00"),
            "duration": duration,
            "timezone": text("timezone", "UTC"),
            "settings": {
                "host_video": true,
                "participant_video": true,
                "join_before_host": false,
                "mute_upon_entry": false,
                "watermark": false,
                "use_pmi": false,
            },
        })
    }

    async fn schedule(&self, url: &str, body: &Value) -> Result<Value, AgentError> {
        let token = self.generate_token(chrono::Utc::now().timestamp())?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Http(format!("{} {}", status, text)));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| AgentError::Http(format!("Invalid response body: {}", e)))
    }
}

#[async_trait]
impl Agent for MeetingScheduler {
    fn name(&self) -> &str {
        AgentKind::MeetingScheduler.display_name()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::MeetingScheduler
    }

    fn input_schema(&self) -> SchemaSpec {
        let string = |d: &str| PropertySpec::of(SchemaType::String).describe(d);
        SchemaSpec::object()
            .property("meeting_topic", string("The topic of the meeting."))
            .property(
                "meeting_start_time",
                string("The start time of the meeting in ISO 8601 format (YYYY-MM-DDTHH:MM:SS).")
                    .with_format("date-time"),
            )
            .property(
                "meeting_duration",
                PropertySpec::of(SchemaType::Integer).describe("The duration of the meeting in minutes."),
            )
            .property("timezone", string("Timezone of the meeting"))
    }

    fn output_schema(&self) -> SchemaSpec {
        SchemaSpec::object()
            .property(
                "meeting_info",
                PropertySpec::of(SchemaType::Object)
                    .describe("Details of the scheduled meeting, as returned by the API."),
            )
            .property(
                "error",
                PropertySpec::of(SchemaType::String).describe("Error message, if any."),
            )
    }

    fn config_schema(&self) -> SchemaSpec {
        SchemaSpec::object().property(
            "user_id",
            PropertySpec::of(SchemaType::String).describe("User id of the Zoom account"),
        )
    }

    async fn process(
        &mut self,
        input: Payload,
        _context: Option<&ExecutionContext>,
    ) -> Result<Payload, AgentError> {
        let url = format!("{}/users/{}/meetings", self.base_url, self.user_id);
        let body = Self::meeting_request(&input);
        let mut out = input;

        let (succeeded, detail) = match self.schedule(&url, &body).await {
            Ok(info) => {
                let meeting_id = info.get("id").map(|id| id.to_string());
                tracing::info!("[MeetingScheduler] Meeting scheduled: {:?}", meeting_id);
                out.insert("meeting_info".into(), info);
                (true, meeting_id)
            }
            Err(e) => {
                let message = format!("Failed to schedule Zoom meeting: {}", e);
                tracing::error!("[MeetingScheduler] {}", message);
                out.insert("error".into(), json!(message));
                (false, Some(message))
            }
        };

        self.last_effect = Some(SideEffectRecord {
            step: 0,
            agent_id: 0,
            agent_name: self.name().to_string(),
            action: "schedule_meeting".to_string(),
            target: url,
            succeeded,
            detail,
        });
        Ok(out)
    }

    fn side_effect(&self) -> Option<SideEffectRecord> {
        self.last_effect.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(key: Option<&str>, secret: Option<&str>) -> SchedulerConfig {
        SchedulerConfig {
            api_key: key.map(str::to_string),
            api_secret: secret.map(str::to_string),
            base_url: "http://127.0.0.1:9".to_string(),
            user_id: "me".to_string(),
        }
    }

    #[test]
    fn test_missing_credentials_fail_construction() {
        let result = MeetingScheduler::new(
            &settings(Some("key"), None),
            reqwest::Client::new(),
            &Payload::new(),
        );
        assert!(matches!(result, Err(FlowError::Config(_))));
    }

    #[test]
    fn test_token_is_signed_hs256() {
        let agent = MeetingScheduler::new(
            &settings(Some("key"), Some("secret")),
            reqwest::Client::new(),
            &Payload::new(),
        )
        .unwrap();
        let token = agent.generate_token(1_000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let claims: Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["iss"], "key");
        assert_eq!(claims["exp"], 4_600);

        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret").unwrap();
        mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());
        mac.verify_slice(&URL_SAFE_NO_PAD.decode(parts[2]).unwrap())
            .unwrap();
    }

    #[test]
    fn test_request_defaults() {
        let mut input = Payload::new();
        input.insert("meeting_duration".into(), json!("45"));
        let body = MeetingScheduler::meeting_request(&input);
        assert_eq!(body["topic"], "My Meeting");
        assert_eq!(body["duration"], 45);
        assert_eq!(body["timezone"], "UTC");
        assert_eq!(body["settings"]["use_pmi"], false);
    }

    #[test]
    fn test_fractional_duration_is_rounded() {
        let mut input = Payload::new();
        input.insert("meeting_duration".into(), json!(30.0));
        assert_eq!(MeetingScheduler::meeting_request(&input)["duration"], 30);

        input.insert("meeting_duration".into(), json!(44.6));
        assert_eq!(MeetingScheduler::meeting_request(&input)["duration"], 45);

        input.insert("meeting_duration".into(), json!("soon"));
        assert_eq!(MeetingScheduler::meeting_request(&input)["duration"], 60);
    }

    #[tokio::test]
    async fn test_unreachable_api_records_error() {
        let mut config = Payload::new();
        config.insert("user_id".into(), json!("host@example.com"));
        let mut agent = MeetingScheduler::new(
            &settings(Some("key"), Some("secret")),
            reqwest::Client::new(),
            &config,
        )
        .unwrap();

        let mut input = Payload::new();
        input.insert("meeting_topic".into(), json!("Retro"));
        let out = agent.process(input, None).await.unwrap();

        assert_eq!(out["meeting_topic"], "Retro");
        assert!(out["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to schedule Zoom meeting: "));
        assert!(out.get("meeting_info").is_none());

        let effect = agent.side_effect().unwrap();
        assert!(!effect.succeeded);
        assert_eq!(effect.action, "schedule_meeting");
        assert_eq!(effect.target, "http://127.0.0.1:9/users/host@example.com/meetings");
    }
}
