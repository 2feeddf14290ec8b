//! HTTP completion client for the Anthropic and OpenAI APIs.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;

use super::provider::{Provider, ProviderSelection};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variable to override the request timeout.
const TIMEOUT_ENV_VAR: &str = "DOCTR_LLM_TIMEOUT";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Characters of an error body kept in [`LlmError::Api`].
const MAX_ERROR_BODY: usize = 500;

/// Get the request timeout from the environment or use the default.
///
/// Logs a warning if `DOCTR_LLM_TIMEOUT` is set but is not a positive
/// number of seconds.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// A single prompt sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Trait for sending one completion request.
///
/// This abstraction allows swapping the HTTP client for a fake in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the request once and return the reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    fn provider(&self) -> Provider;

    fn model(&self) -> String;
}

/// Client that calls the provider's HTTP API with `reqwest`.
pub struct HttpCompletionClient {
    http: Client,
    selection: ProviderSelection,
    base_url: String,
    timeout: Duration,
}

impl HttpCompletionClient {
    pub fn new(selection: ProviderSelection) -> Result<Self, LlmError> {
        let base_url = selection.provider.base_url();
        Self::with_base_url(selection, base_url)
    }

    /// Build a client against a custom API root (used by tests).
    pub fn with_base_url(
        selection: ProviderSelection,
        base_url: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let timeout = get_timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            selection,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn transport_error(&self, source: reqwest::Error) -> LlmError {
        let provider = self.selection.provider;
        if source.is_timeout() {
            LlmError::Timeout {
                provider,
                secs: self.timeout.as_secs(),
            }
        } else {
            LlmError::RequestFailed { provider, source }
        }
    }

    async fn send_anthropic(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: &self.selection.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.selection.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let text = self.read_success_body(response).await?;
        let parsed: AnthropicResponse = self.decode(&text)?;

        Ok(parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    async fn send_openai(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = OpenAiRequest {
            model: &self.selection.model,
            max_completion_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.selection.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let text = self.read_success_body(response).await?;
        let parsed: OpenAiResponse = self.decode(&text)?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Map non-success statuses to errors and read the body of a success.
    async fn read_success_body(&self, response: reqwest::Response) -> Result<String, LlmError> {
        let provider = self.selection.provider;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Unauthorized {
                provider,
                status: status.as_u16(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(LlmError::RateLimited {
                provider,
                retry_after,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider,
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, text: &str) -> Result<T, LlmError> {
        serde_json::from_str(text).map_err(|e| LlmError::InvalidResponse {
            provider: self.selection.provider,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            "Sending {} character prompt to {} ({})",
            request.prompt.len(),
            self.selection.provider,
            self.selection.model
        );

        let reply = match self.selection.provider {
            Provider::Anthropic => self.send_anthropic(request).await?,
            Provider::OpenAi => self.send_openai(request).await?,
        };

        if reply.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: self.selection.provider,
            });
        }
        Ok(reply)
    }

    fn provider(&self) -> Provider {
        self.selection.provider
    }

    fn model(&self) -> String {
        self.selection.model.clone()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_completion_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_timeout_default() {
        temp_env::with_var_unset(TIMEOUT_ENV_VAR, || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_from_env() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("30"), || {
            assert_eq!(get_timeout(), Duration::from_secs(30));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_invalid_env_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("soon"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_zero_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("0"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let selection = ProviderSelection::new(Provider::OpenAi, "gpt-4o", "key");
        let client = HttpCompletionClient::with_base_url(selection, "http://localhost:9/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9");
        assert_eq!(client.provider(), Provider::OpenAi);
        assert_eq!(client.model(), "gpt-4o");
    }
}
