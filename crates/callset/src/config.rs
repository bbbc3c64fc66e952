//! Endpoint, credentials, and model selection.
//!
//! [`GenConfig`] is read from the environment and then adjusted by CLI
//! flags. Two providers are supported:
//!
//! - **OpenAI-compatible** (default): `CALLSET_ENDPOINT` (default
//!   OpenRouter), `CALLSET_API_KEY` or `OPENROUTER_KEY`, `CALLSET_MODEL`.
//! - **Azure OpenAI**, selected when `AZURE_ENDPOINT` is set:
//!   `AZURE_API_KEY` (or `OPENAI_API_KEY_GPT4`), `API_VERSION` (default
//!   `2023-07-01-preview`),
//!   `AZURE_GPT_MODEL` as the deployment name (default `gpt-4-32k`).
//!
//! Empty variables count as unset.

use crate::generate::config::GenerationConfig;
use crate::{ChatClient, DEFAULT_AZURE_API_VERSION, DEFAULT_MODEL, Endpoint, OPENROUTER_URL};

/// Default Azure deployment name.
pub const DEFAULT_AZURE_MODEL: &str = "gpt-4-32k";

/// Where completion requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    OpenAiCompatible { url: String },
    Azure { resource_url: String, api_version: String },
}

#[derive(Clone)]
pub struct GenConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    /// Model identifier; the deployment name for Azure.
    pub model: String,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAiCompatible {
                url: OPENROUTER_URL.to_string(),
            },
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for GenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .finish()
    }
}

impl GenConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(resource_url) = var("AZURE_ENDPOINT") {
            return Self {
                provider: Provider::Azure {
                    resource_url,
                    api_version: var("API_VERSION")
                        .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                },
                api_key: var("AZURE_API_KEY").or_else(|| var("OPENAI_API_KEY_GPT4")),
                model: var("AZURE_GPT_MODEL").unwrap_or_else(|| DEFAULT_AZURE_MODEL.to_string()),
            };
        }

        Self {
            provider: Provider::OpenAiCompatible {
                url: var("CALLSET_ENDPOINT").unwrap_or_else(|| OPENROUTER_URL.to_string()),
            },
            api_key: var("CALLSET_API_KEY").or_else(|| var("OPENROUTER_KEY")),
            model: var("CALLSET_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at an OpenAI-compatible URL, replacing any Azure settings.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.provider = Provider::OpenAiCompatible { url: url.into() };
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn endpoint(&self) -> Result<Endpoint, String> {
        let key = self.api_key.clone().ok_or_else(|| match self.provider {
            Provider::OpenAiCompatible { .. } => {
                "no API key: set CALLSET_API_KEY or OPENROUTER_KEY".to_string()
            }
            Provider::Azure { .. } => "no API key: set AZURE_API_KEY or OPENAI_API_KEY_GPT4".to_string(),
        })?;
        Ok(match &self.provider {
            Provider::OpenAiCompatible { url } => Endpoint::bearer(url.clone(), key),
            Provider::Azure {
                resource_url,
                api_version,
            } => Endpoint::azure(resource_url, &self.model, api_version, key),
        })
    }

    pub fn build_client(&self) -> Result<ChatClient, String> {
        ChatClient::new(self.endpoint()?)
    }

    /// Generation defaults for this model.
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig::new(self.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiAuth;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_openrouter() {
        let config = GenConfig::from_lookup(lookup(&[("OPENROUTER_KEY", "sk-or")]));
        assert_eq!(
            config.provider,
            Provider::OpenAiCompatible {
                url: OPENROUTER_URL.into()
            }
        );
        assert_eq!(config.model, DEFAULT_MODEL);
        let endpoint = config.endpoint().unwrap();
        assert!(matches!(endpoint.auth, ApiAuth::Bearer(ref k) if k == "sk-or"));
    }

    #[test]
    fn callset_vars_take_precedence() {
        let config = GenConfig::from_lookup(lookup(&[
            ("OPENROUTER_KEY", "sk-or"),
            ("CALLSET_API_KEY", "sk-own"),
            ("CALLSET_MODEL", "gpt-4o-mini"),
            ("CALLSET_ENDPOINT", "http://localhost:8080/v1/chat/completions"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-own"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(
            config.endpoint().unwrap().url,
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn azure_when_endpoint_set() {
        let config = GenConfig::from_lookup(lookup(&[
            ("AZURE_ENDPOINT", "https://res.openai.azure.com/"),
            ("AZURE_API_KEY", "az"),
            ("API_VERSION", ""),
        ]));
        assert_eq!(config.model, DEFAULT_AZURE_MODEL);
        let endpoint = config.endpoint().unwrap();
        assert_eq!(
            endpoint.url,
            "https://res.openai.azure.com/openai/deployments/gpt-4-32k/chat/completions?api-version=2023-07-01-preview"
        );
        assert!(matches!(endpoint.auth, ApiAuth::AzureKey(_)));
    }

    #[test]
    fn azure_key_falls_back_to_gpt4_variable() {
        let config = GenConfig::from_lookup(lookup(&[
            ("AZURE_ENDPOINT", "https://res.openai.azure.com/"),
            ("AZURE_API_KEY", " "),
            ("OPENAI_API_KEY_GPT4", "gpt4-key"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("gpt4-key"));
        assert!(config.endpoint().is_ok());

        let both = GenConfig::from_lookup(lookup(&[
            ("AZURE_ENDPOINT", "https://res.openai.azure.com/"),
            ("AZURE_API_KEY", "az"),
            ("OPENAI_API_KEY_GPT4", "gpt4-key"),
        ]));
        assert_eq!(both.api_key.as_deref(), Some("az"));

        let none = GenConfig::from_lookup(lookup(&[("AZURE_ENDPOINT", "https://x")]));
        assert!(none.endpoint().unwrap_err().contains("OPENAI_API_KEY_GPT4"));
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = GenConfig::from_lookup(lookup(&[])).endpoint().unwrap_err();
        assert!(err.contains("CALLSET_API_KEY"));
    }

    #[test]
    fn overrides_and_redaction() {
        let config = GenConfig::from_lookup(lookup(&[("AZURE_ENDPOINT", "https://x")]))
            .with_url("http://localhost:1234")
            .with_model("local")
            .with_api_key("secret");
        assert!(matches!(config.provider, Provider::OpenAiCompatible { .. }));
        assert_eq!(config.generation().model, "local");
        assert!(!format!("{config:?}").contains("secret"));
    }
}
