// Configuration layer for provider-agnostic model client creation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Google's OpenAI-compatible endpoint for Gemini models
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Type of model provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Gemini,
    OpenAI,
}

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Base URL (optional, defaults to the provider's public endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Provider-specific configuration details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderDetails {
    Gemini(OpenAIConfig),
    OpenAI(OpenAIConfig),
}

/// Complete provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub details: ProviderDetails,
}

impl ProviderConfig {
    /// Create Gemini provider config (OpenAI-compatible endpoint)
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::Gemini(OpenAIConfig::new(api_key)),
        }
    }

    /// Create OpenAI provider config
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::OpenAI(OpenAIConfig::new(api_key)),
        }
    }

    /// Override the endpoint, e.g. for a local proxy
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.details = match self.details {
            ProviderDetails::Gemini(cfg) => ProviderDetails::Gemini(cfg.with_base_url(base_url)),
            ProviderDetails::OpenAI(cfg) => ProviderDetails::OpenAI(cfg.with_base_url(base_url)),
        };
        self
    }

    /// Get the provider type
    pub fn provider_type(&self) -> ProviderType {
        match self.details {
            ProviderDetails::Gemini(_) => ProviderType::Gemini,
            ProviderDetails::OpenAI(_) => ProviderType::OpenAI,
        }
    }

    pub fn api_key(&self) -> &str {
        match &self.details {
            ProviderDetails::Gemini(cfg) | ProviderDetails::OpenAI(cfg) => &cfg.api_key,
        }
    }
}

/// Factory for creating model clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    /// Create a chat client from provider configuration
    pub fn create_chat_client(
        config: ProviderConfig,
    ) -> Result<Arc<dyn crate::traits::ChatClient>> {
        match config.details {
            ProviderDetails::Gemini(cfg) => {
                let base_url = cfg.base_url.unwrap_or_else(|| GEMINI_OPENAI_BASE.to_string());
                let client = crate::openai::OpenAIClient::with_base_url(cfg.api_key, base_url)?;
                Ok(Arc::new(client))
            }
            ProviderDetails::OpenAI(cfg) => {
                let base_url = cfg
                    .base_url
                    .unwrap_or_else(|| crate::openai::OPENAI_API_BASE.to_string());
                let client = crate::openai::OpenAIClient::with_base_url(cfg.api_key, base_url)?;
                Ok(Arc::new(client))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_config() {
        let config = ProviderConfig::gemini("test-key");
        assert_eq!(config.provider_type(), ProviderType::Gemini);
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn test_base_url_override() {
        let config = ProviderConfig::openai("test-key").with_base_url("http://localhost:9999/v1");
        match config.details {
            ProviderDetails::OpenAI(cfg) => {
                assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:9999/v1"));
            }
            _ => panic!("Expected OpenAI details"),
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ProviderConfig::gemini("test-key");

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"gemini\""));
        let deserialized: ProviderConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.provider_type(), deserialized.provider_type());
    }

    #[test]
    fn test_factory_builds_client() {
        let client = ClientFactory::create_chat_client(ProviderConfig::gemini("k"));
        assert!(client.is_ok());
    }
}
