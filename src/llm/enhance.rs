//! One-shot AI enhancement of a change document.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::diff::ChangeSet;
use crate::docs::DocumentationDraft;
use crate::error::LlmError;

use super::client::{CompletionClient, CompletionRequest};
use super::json::extract_json_object;
use super::prompt::{CHANGE_SYSTEM_PROMPT, MAX_REPLY_TOKENS, build_change_prompt};
use super::provider::Provider;

/// Impact of a change set as judged by the model.
///
/// Deserializes case-insensitively and accepts `low`/`medium`/`high` as
/// synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Minor,
    #[default]
    Moderate,
    Major,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Minor => "minor",
            ImpactLevel::Moderate => "moderate",
            ImpactLevel::Major => "major",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minor" | "low" => Ok(Self::Minor),
            "moderate" | "medium" => Ok(Self::Moderate),
            "major" | "high" => Ok(Self::Major),
            _ => Err(format!("Unknown impact level: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for ImpactLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<ImpactLevel>().map_err(serde::de::Error::custom)
    }
}

/// Structured analysis returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocAnalysis {
    pub summary: String,
    #[serde(default)]
    pub impact_level: ImpactLevel,
    #[serde(default)]
    pub affected_components: Vec<String>,
    #[serde(default)]
    pub breaking_changes: Vec<String>,
    #[serde(default)]
    pub new_features: Vec<String>,
    #[serde(default)]
    pub bug_fixes: Vec<String>,
    #[serde(default)]
    pub documentation_sections: Vec<String>,
    #[serde(default)]
    pub usage_examples_needed: bool,
    #[serde(default)]
    pub migration_guide_needed: bool,
    /// Markdown body of the document.
    #[serde(default)]
    pub document: String,
}

impl DocAnalysis {
    /// Decode a model reply, tolerating fences and surrounding prose.
    pub fn from_reply(reply: &str, provider: Provider) -> Result<Self, LlmError> {
        let object = extract_json_object(reply).ok_or_else(|| LlmError::InvalidResponse {
            provider,
            message: "reply does not contain a JSON object".to_string(),
        })?;

        let analysis: DocAnalysis = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| LlmError::InvalidResponse {
                provider,
                message: e.to_string(),
            })?;

        if analysis.summary.trim().is_empty() && analysis.document.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider,
                message: "reply has neither a summary nor a document".to_string(),
            });
        }

        Ok(analysis)
    }
}

/// A successful enhancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub provider: Provider,
    pub model: String,
    pub analysis: DocAnalysis,
}

/// Why a document was written without AI content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// AI was turned off by configuration or `--no-ai`.
    Disabled,
    MissingCredentials,
    /// The single provider call failed; holds the error message.
    ProviderFailed(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Disabled => write!(f, "AI enhancement is disabled"),
            UnavailableReason::MissingCredentials => write!(
                f,
                "no API key found (set ANTHROPIC_API_KEY or OPENAI_API_KEY)"
            ),
            UnavailableReason::ProviderFailed(message) => write!(f, "{}", message),
        }
    }
}

/// Outcome of the enhancement step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enhancement {
    Generated(GeneratedContent),
    Unavailable(UnavailableReason),
}

impl Enhancement {
    pub fn is_generated(&self) -> bool {
        matches!(self, Enhancement::Generated(_))
    }
}

/// Send one request for `changes` and decode the reply.
pub async fn request_analysis(
    client: &dyn CompletionClient,
    changes: &ChangeSet,
    draft: &DocumentationDraft,
) -> Result<GeneratedContent, LlmError> {
    let request = CompletionRequest {
        system: CHANGE_SYSTEM_PROMPT.to_string(),
        prompt: build_change_prompt(changes, draft),
        max_tokens: MAX_REPLY_TOKENS,
    };

    let reply = client.complete(&request).await?;
    let analysis = DocAnalysis::from_reply(&reply, client.provider())?;
    debug!(
        "{} analysis: impact {}, {} section(s)",
        client.provider(),
        analysis.impact_level,
        analysis.documentation_sections.len()
    );

    Ok(GeneratedContent {
        provider: client.provider(),
        model: client.model(),
        analysis,
    })
}

/// Run the enhancement step, converting any failure into [`Enhancement::Unavailable`].
pub async fn enhance(
    client: Result<&dyn CompletionClient, UnavailableReason>,
    changes: &ChangeSet,
    draft: &DocumentationDraft,
) -> Enhancement {
    let client = match client {
        Ok(client) => client,
        Err(reason) => return Enhancement::Unavailable(reason),
    };

    match request_analysis(client, changes, draft).await {
        Ok(content) => Enhancement::Generated(content),
        Err(e) => {
            warn!("AI enhancement unavailable: {}", e);
            Enhancement::Unavailable(UnavailableReason::ProviderFailed(e.to_string()))
        }
    }
}
