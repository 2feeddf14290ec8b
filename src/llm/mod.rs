//! LLM provider selection, prompts and the one-shot enhancement call.

pub mod client;
pub mod enhance;
pub mod json;
pub mod prompt;
pub mod provider;

pub use client::{CompletionClient, CompletionRequest, HttpCompletionClient};
pub use enhance::{
    DocAnalysis, Enhancement, GeneratedContent, ImpactLevel, UnavailableReason, enhance,
    request_analysis,
};
pub use json::{extract_json_object, strip_outer_fence};
pub use prompt::{build_change_prompt, build_wiki_prompt, sanitize_for_prompt};
pub use provider::{Provider, ProviderSelection, select_provider};

use crate::config::Config;
use crate::error::LlmError;

/// Build the HTTP client for `model`, or explain why AI is unavailable.
pub fn client_for(
    config: &Config,
    model: &str,
    use_ai: bool,
) -> Result<HttpCompletionClient, UnavailableReason> {
    if !use_ai {
        return Err(UnavailableReason::Disabled);
    }
    let selection = match select_provider(model, &config.credentials) {
        Ok(selection) => selection,
        Err(LlmError::MissingCredentials) => return Err(UnavailableReason::MissingCredentials),
        Err(e) => return Err(UnavailableReason::ProviderFailed(e.to_string())),
    };
    HttpCompletionClient::new(selection).map_err(|e| UnavailableReason::ProviderFailed(e.to_string()))
}
