//! Chat model selection for the primary classifier.
//!
//! `LLM_MODEL` carries an optional provider prefix (`openai/gpt-4o-mini`,
//! `ollama/llama3`). Anything without a known prefix is treated as a model
//! served by an OpenAI-compatible endpoint at `LLM_BASE_URL`.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{PulseError, Result};
use crate::llm::chat::ChatClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

impl LlmBackend {
    fn select(config: &LlmConfig) -> Self {
        let (provider, _) = parse_llm_provider_model(&config.model);
        let backend = match provider.to_lowercase().as_str() {
            "openai" => Self::OpenAI,
            "openrouter" => Self::OpenRouter,
            "ollama" => Self::Ollama,
            "lmstudio" => Self::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => Self::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None => {
                    return Self::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            },
        };

        if backend.is_hosted() && config.api_key.is_none() {
            return Self::Unavailable {
                reason: format!("API key required for {}", config.model),
            };
        }
        backend
    }

    fn is_hosted(&self) -> bool {
        matches!(self, Self::OpenAI | Self::OpenRouter)
    }

    fn default_base_url(&self) -> Option<&str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::LmStudio => Some("http://localhost:1234/v1"),
            Self::OpenAICompatible { base_url } => Some(base_url),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Cheap to clone. Holds no connection until the first request.
#[derive(Debug, Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };
        Self {
            backend: LlmBackend::select(config),
            config: Some(Arc::new(config.clone())),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    /// Model name as sent on the wire, without the provider prefix.
    pub fn model(&self) -> Option<&str> {
        let config = self.config.as_deref().filter(|_| self.is_available())?;
        Some(match self.backend {
            LlmBackend::OpenAICompatible { .. } => config.model.as_str(),
            _ => parse_llm_provider_model(&config.model).1,
        })
    }

    pub fn base_url(&self) -> Option<&str> {
        if !self.is_available() {
            return None;
        }
        self.config
            .as_deref()?
            .base_url
            .as_deref()
            .or_else(|| self.backend.default_base_url())
    }

    /// Ask for a JSON reply and decode it into `T`.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<T> {
        if prompt.trim().is_empty() {
            return Err(PulseError::Validation("Prompt cannot be empty".to_string()));
        }
        let reply = self
            .chat()?
            .json_reply(prompt, system_prompt, options)
            .await?;
        serde_json::from_value(reply)
            .map_err(|e| PulseError::Llm(format!("Failed to deserialize response: {e}")))
    }

    fn chat(&self) -> Result<ChatClient> {
        if let LlmBackend::Unavailable { reason } = &self.backend {
            return Err(PulseError::LlmUnavailable(reason.clone()));
        }
        match (self.config.as_deref(), self.base_url(), self.model()) {
            (Some(config), Some(base_url), Some(model)) => ChatClient::new(base_url, model, config),
            _ => Err(PulseError::LlmUnavailable("No config available".to_string())),
        }
    }
}
