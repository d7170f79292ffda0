//! Agent Registry: turns catalog records into agent instances.

use std::sync::Arc;

use crate::agents::{
    Agent, EmailManager, GrammarChecker, MeetingScheduler, MeetingSummarizer, SeoOptimizer,
};
use crate::config::SchedulerConfig;
use crate::error::FlowError;
use crate::knowledge::KnowledgeStore;
use crate::llm::LlmClient;
use crate::models::{AgentKind, AgentSpec, Payload};

/// Shared capabilities injected into every agent the registry builds.
#[derive(Clone)]
pub struct AgentServices {
    pub llm: Arc<dyn LlmClient>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub scheduler: SchedulerConfig,
    pub http: reqwest::Client,
}

#[derive(Clone)]
pub struct AgentRegistry {
    services: AgentServices,
}

impl AgentRegistry {
    pub fn new(services: AgentServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    /// Agent variants this registry can construct.
    pub fn kinds(&self) -> Vec<AgentKind> {
        AgentKind::ALL.to_vec()
    }

    /// Build a fresh agent for one step.
    ///
    /// Construction errors (e.g. missing scheduler credentials) are returned
    /// as-is; the engine does not recover from them.
    pub fn instantiate(
        &self,
        spec: &AgentSpec,
        config: &Payload,
    ) -> Result<Box<dyn Agent>, FlowError> {
        let s = &self.services;
        let agent: Box<dyn Agent> = match spec.kind {
            AgentKind::MeetingSummarizer => Box::new(MeetingSummarizer::new(s.llm.clone(), config)),
            AgentKind::EmailManager => Box::new(EmailManager::new(s.llm.clone(), config)),
            AgentKind::SeoOptimizer => Box::new(SeoOptimizer::new(s.knowledge.clone(), config)),
            AgentKind::GrammarChecker => Box::new(GrammarChecker::new(s.llm.clone(), config)),
            AgentKind::MeetingScheduler => Box::new(MeetingScheduler::new(
                &s.scheduler,
                s.http.clone(),
                config,
            )?),
        };
        tracing::debug!(
            "[AgentRegistry] Instantiated '{}' as {}",
            spec.name,
            spec.kind.as_str()
        );
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::InMemoryKnowledgeStore;
    use crate::llm::MockLlmClient;
    use crate::store::builtin_agents;

    fn registry(scheduler: SchedulerConfig) -> AgentRegistry {
        AgentRegistry::new(AgentServices {
            llm: Arc::new(MockLlmClient::unavailable()),
            knowledge: Arc::new(InMemoryKnowledgeStore::new()),
            scheduler,
            http: reqwest::Client::new(),
        })
    }

    fn no_credentials() -> SchedulerConfig {
        SchedulerConfig {
            api_key: None,
            api_secret: None,
            base_url: "http://127.0.0.1:9".to_string(),
            user_id: "me".to_string(),
        }
    }

    #[test]
    fn test_instantiates_every_llm_agent() {
        let registry = registry(no_credentials());
        for spec in builtin_agents()
            .iter()
            .filter(|a| a.kind != AgentKind::MeetingScheduler)
        {
            let agent = registry.instantiate(spec, &Payload::new()).unwrap();
            assert_eq!(agent.kind(), spec.kind);
            assert_eq!(agent.name(), spec.name);
        }
        assert_eq!(registry.kinds().len(), 5);
    }

    #[test]
    fn test_scheduler_without_credentials_is_fatal() {
        let registry = registry(no_credentials());
        let scheduler = builtin_agents().remove(4);
        let err = registry.instantiate(&scheduler, &Payload::new()).err().unwrap();
        assert!(matches!(err, FlowError::Config(_)));

        let registry = registry_with_credentials();
        assert!(registry.instantiate(&scheduler, &Payload::new()).is_ok());
    }

    fn registry_with_credentials() -> AgentRegistry {
        registry(SchedulerConfig {
            api_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            ..no_credentials()
        })
    }
}
