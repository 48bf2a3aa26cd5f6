//! Maps agent roles to provider endpoints.

use async_openai::config::OpenAIConfig;
use std::fmt;
use std::sync::Arc;

use crate::llm_client::{LLMClient, OpenAICompatibleClient};

pub const DEFAULT_ACTOR_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_PASSIVE_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_FALLBACK_BASE_URL: &str = "https://api.openai.com/v1";

/// The Actor converses in real time; every other agent is passive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Actor,
    Passive,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Actor => write!(f, "actor"),
            AgentRole::Passive => write!(f, "passive"),
        }
    }
}

/// Provider settings for a single role. Incomplete settings fall back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEndpoint {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for FallbackEndpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FALLBACK_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }
}

/// Provider configuration, built once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub actor: RoleEndpoint,
    pub passive: RoleEndpoint,
    pub fallback: FallbackEndpoint,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            actor: RoleEndpoint {
                base_url: None,
                api_key: None,
                model: DEFAULT_ACTOR_MODEL.to_string(),
            },
            passive: RoleEndpoint {
                base_url: None,
                api_key: None,
                model: DEFAULT_PASSIVE_MODEL.to_string(),
            },
            fallback: FallbackEndpoint::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Role,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub source: ModelSource,
}

#[derive(Debug, Clone)]
pub struct ModelResolver {
    config: ModelConfig,
}

impl ModelResolver {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Picks the endpoint for `role`.
    ///
    /// A role is used only when both its base URL and credential are set;
    /// otherwise the global default provider answers for it.
    pub fn resolve(&self, role: AgentRole) -> ResolvedModel {
        let endpoint = match role {
            AgentRole::Actor => &self.config.actor,
            AgentRole::Passive => &self.config.passive,
        };

        match (&endpoint.base_url, &endpoint.api_key) {
            (Some(base_url), Some(api_key)) => ResolvedModel {
                base_url: base_url.clone(),
                api_key: Some(api_key.clone()),
                model: endpoint.model.clone(),
                source: ModelSource::Role,
            },
            _ => ResolvedModel {
                base_url: self.config.fallback.base_url.clone(),
                api_key: self.config.fallback.api_key.clone(),
                model: self.config.fallback.model.clone(),
                source: ModelSource::Fallback,
            },
        }
    }

    /// Builds a client for `role`.
    ///
    /// A missing credential still yields a client; its calls fail at request
    /// time and surface as generation errors.
    pub fn client_for(&self, role: AgentRole) -> Arc<dyn LLMClient> {
        let resolved = self.resolve(role);
        let mut config = OpenAIConfig::new().with_api_base(resolved.base_url);
        if let Some(api_key) = resolved.api_key {
            config = config.with_api_key(api_key);
        }
        Arc::new(OpenAICompatibleClient::new(config, resolved.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_actor(base_url: Option<&str>, api_key: Option<&str>) -> ModelConfig {
        let mut config = ModelConfig::default();
        config.actor.base_url = base_url.map(str::to_string);
        config.actor.api_key = api_key.map(str::to_string);
        config.fallback.api_key = Some("sk-global".to_string());
        config
    }

    #[test]
    fn test_complete_role_endpoint_is_used() {
        let resolver = ModelResolver::new(config_with_actor(
            Some("https://api.groq.com/openai/v1"),
            Some("gsk-actor"),
        ));
        let resolved = resolver.resolve(AgentRole::Actor);
        assert_eq!(resolved.source, ModelSource::Role);
        assert_eq!(resolved.model, DEFAULT_ACTOR_MODEL);
        assert_eq!(resolved.api_key.as_deref(), Some("gsk-actor"));
    }

    #[test]
    fn test_partial_role_endpoint_falls_back() {
        let resolver =
            ModelResolver::new(config_with_actor(Some("https://api.groq.com/openai/v1"), None));
        let resolved = resolver.resolve(AgentRole::Actor);
        assert_eq!(resolved.source, ModelSource::Fallback);
        assert_eq!(resolved.base_url, DEFAULT_FALLBACK_BASE_URL);
        assert_eq!(resolved.model, DEFAULT_FALLBACK_MODEL);
        assert_eq!(resolved.api_key.as_deref(), Some("sk-global"));
    }

    #[test]
    fn test_unconfigured_passive_falls_back_without_key() {
        let resolver = ModelResolver::new(ModelConfig::default());
        let resolved = resolver.resolve(AgentRole::Passive);
        assert_eq!(resolved.source, ModelSource::Fallback);
        assert!(resolved.api_key.is_none());
        // Building the client must not fail even without a credential.
        let _client = resolver.client_for(AgentRole::Passive);
    }
}
