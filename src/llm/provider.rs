//! Provider inference from model names and credential selection.

use std::fmt;

use tracing::{debug, warn};

use crate::config::{Credentials, DEFAULT_MODEL};
use crate::error::LlmError;

/// Model used when falling back to OpenAI because only its key is present.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => DEFAULT_MODEL,
            Provider::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAi => "https://api.openai.com",
        }
    }

    /// Infer the provider from a model name. Unknown names go to Anthropic.
    pub fn for_model(model: &str) -> Provider {
        let lower = model.trim().to_ascii_lowercase();
        let openai_prefixes = ["gpt", "o1", "o3", "o4", "chatgpt"];
        if openai_prefixes.iter().any(|p| lower.starts_with(p)) {
            Provider::OpenAi
        } else {
            Provider::Anthropic
        }
    }

    pub fn other(&self) -> Provider {
        match self {
            Provider::Anthropic => Provider::OpenAi,
            Provider::OpenAi => Provider::Anthropic,
        }
    }

    fn api_key<'a>(&self, credentials: &'a Credentials) -> Option<&'a str> {
        let key = match self {
            Provider::Anthropic => credentials.anthropic_api_key.as_deref(),
            Provider::OpenAi => credentials.openai_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provider, model and key a client will use.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: Provider,
    pub model: String,
    api_key: String,
}

impl ProviderSelection {
    pub fn new(provider: Provider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Choose the provider for `model` given the available credentials.
///
/// When the inferred provider has no key but the other one does, switches to
/// the other provider with its default model. Fails only when neither key is
/// present.
pub fn select_provider(
    model: &str,
    credentials: &Credentials,
) -> Result<ProviderSelection, LlmError> {
    let preferred = Provider::for_model(model);

    if let Some(key) = preferred.api_key(credentials) {
        debug!("Using {} with model {}", preferred, model);
        return Ok(ProviderSelection::new(preferred, model, key));
    }

    let other = preferred.other();
    if let Some(key) = other.api_key(credentials) {
        warn!(
            "{} is not set for model '{}'; using {} with {} instead",
            preferred.env_var(),
            model,
            other,
            other.default_model()
        );
        return Ok(ProviderSelection::new(other, other.default_model(), key));
    }

    Err(LlmError::MissingCredentials)
}
