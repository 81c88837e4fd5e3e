//! rig-core integration for LLM-backed answers.
//!
//! Uses rig-core's provider clients and Agent abstraction for multi-provider
//! support. Currently supports: Anthropic, OpenAI, Cohere, Gemini, Perplexity,
//! DeepSeek, xAI, Groq, and any OpenAI-compatible API.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers;

use crate::config::ProviderConfig;
use crate::models::ProviderName;

use super::{AnswerBackend, GenerationRequest, ProviderError};

/// Build a plain agent from a rig-core client and prompt it.
///
/// Always sets `max_tokens`: without it some providers (e.g. Gemini)
/// default to a low limit that truncates responses.
macro_rules! prompt_simple {
    ($client:expr, $request:expr, $label:expr) => {{
        let agent = $client
            .agent($request.model)
            .preamble($request.system)
            .temperature($request.temperature)
            .max_tokens($request.max_tokens)
            .build();
        agent
            .prompt($request.prompt)
            .await
            .map_err(|e| ProviderError::ApiError(format!("{} API error: {e}", $label)))
    }};
}

/// Create a rig-core client using the `Client::new(api_key)` convention.
macro_rules! new_client {
    ($provider_mod:path, $api_key:expr, $label:expr) => {{
        <$provider_mod>::new($api_key).map_err(|e| {
            ProviderError::ApiError(format!("failed to create {} client: {e}", $label))
        })
    }};
}

/// rig-core based answer backend.
///
/// The provider name in config selects which rig-core provider to use;
/// the model comes from each request.
pub struct RigBackend {
    config: ProviderConfig,
}

impl RigBackend {
    /// Create a new RigBackend with the given configuration.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key found for provider '{}'. Set {} or {}.",
                config.name,
                crate::constants::ENV_API_KEY,
                config.name.api_key_env_var(),
            )));
        }
        Ok(Self { config })
    }

    /// Build an OpenAI-style client, optionally with a custom base URL.
    fn build_openai_client(
        &self,
        api_key: &str,
    ) -> Result<providers::openai::CompletionsClient, ProviderError> {
        let mut builder = providers::openai::CompletionsClient::builder().api_key(api_key);
        if let Some(ref base_url) = self.config.base_url {
            builder = builder.base_url(base_url);
        }
        let client: providers::openai::CompletionsClient = builder
            .build()
            .map_err(|e| ProviderError::ApiError(format!("failed to create OpenAI client: {e}")))?;
        Ok(client)
    }

    /// Require `base_url` for OpenAI-compatible providers.
    fn require_base_url(&self) -> Result<&str, ProviderError> {
        self.config.base_url.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(
                "openai-compatible provider requires base_url to be set".to_string(),
            )
        })
    }

    /// Get the API key or return an error.
    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("missing API key".to_string()))
    }

    /// Make a completion call through rig-core and return the raw response text.
    async fn call_rig(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;

        match self.config.name {
            ProviderName::Anthropic => {
                let client: providers::anthropic::Client = providers::anthropic::Client::builder()
                    .api_key(api_key)
                    .build()
                    .map_err(|e| {
                        ProviderError::ApiError(format!("failed to create Anthropic client: {e}"))
                    })?;
                prompt_simple!(client, request, "Anthropic")
            }
            ProviderName::OpenAI => {
                let client = self.build_openai_client(api_key)?;
                prompt_simple!(client, request, "OpenAI")
            }
            ProviderName::Cohere => {
                let client = new_client!(providers::cohere::Client, api_key, "Cohere")?;
                prompt_simple!(client, request, "Cohere")
            }
            ProviderName::Gemini => {
                let client = new_client!(providers::gemini::Client, api_key, "Gemini")?;
                prompt_simple!(client, request, "Gemini")
            }
            ProviderName::Perplexity => {
                let client = new_client!(providers::perplexity::Client, api_key, "Perplexity")?;
                prompt_simple!(client, request, "Perplexity")
            }
            ProviderName::DeepSeek => {
                let client = new_client!(providers::deepseek::Client, api_key, "DeepSeek")?;
                prompt_simple!(client, request, "DeepSeek")
            }
            ProviderName::XAI => {
                let client = new_client!(providers::xai::Client, api_key, "xAI")?;
                prompt_simple!(client, request, "xAI")
            }
            ProviderName::Groq => {
                let client = new_client!(providers::groq::Client, api_key, "Groq")?;
                prompt_simple!(client, request, "Groq")
            }
            ProviderName::OpenAICompatible => {
                let base_url = self.require_base_url()?;
                let client: providers::openai::CompletionsClient =
                    providers::openai::CompletionsClient::builder()
                        .api_key(api_key)
                        .base_url(base_url)
                        .build()
                        .map_err(|e| {
                            ProviderError::ApiError(format!(
                                "failed to create OpenAI-compatible client: {e}"
                            ))
                        })?;
                prompt_simple!(client, request, "OpenAI-compatible")
            }
        }
    }
}

#[async_trait]
impl AnswerBackend for RigBackend {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
        tracing::debug!(
            provider = %self.config.name,
            model = request.model,
            prompt_chars = request.prompt.chars().count(),
            "requesting completion"
        );
        let response = self.call_rig(request).await?;
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }
}

/// Classifies a provider error into a short, user-friendly message.
///
/// Returns `Some(message)` for transient errors the user may retry,
/// `None` otherwise.
pub fn classify_error(err: &ProviderError) -> Option<&'static str> {
    match err {
        ProviderError::ApiError(msg) => {
            let msg_lower = msg.to_lowercase();
            if msg_lower.contains("429")
                || msg_lower.contains("rate limit")
                || msg_lower.contains("too many requests")
            {
                Some("Rate limited by API")
            } else if msg_lower.contains("503")
                || msg_lower.contains("service unavailable")
                || msg_lower.contains("high demand")
            {
                Some("High model load")
            } else if msg_lower.contains("529") || msg_lower.contains("overloaded") {
                Some("API overloaded")
            } else if msg_lower.contains("502") {
                Some("API gateway error")
            } else if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
                Some("Request timed out")
            } else if msg_lower.contains("connection") {
                Some("Connection error")
            } else if msg_lower.contains("temporarily") || msg_lower.contains("try again") {
                Some("Temporary API error")
            } else {
                None
            }
        }
        ProviderError::EmptyResponse => Some("Empty model response"),
        ProviderError::NotConfigured(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: ProviderName, api_key: Option<&str>, base_url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name,
            model: "gpt-4o-mini".to_string(),
            base_url: base_url.map(str::to_string),
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn new_backend_missing_api_key() {
        let result = RigBackend::new(config(ProviderName::Anthropic, None, None));
        match result {
            Err(e) => {
                assert!(e.to_string().contains("API key"), "got: {e}");
                assert!(e.to_string().contains("ANTHROPIC_API_KEY"), "got: {e}");
            }
            Ok(_) => panic!("expected error for missing API key"),
        }
    }

    #[test]
    fn new_backend_with_api_key() {
        assert!(RigBackend::new(config(ProviderName::OpenAI, Some("sk-test"), None)).is_ok());
    }

    #[test]
    fn require_base_url_missing() {
        let backend =
            RigBackend::new(config(ProviderName::OpenAICompatible, Some("key"), None)).unwrap();
        let result = backend.require_base_url();
        assert!(result.is_err());
        assert!(
            result.unwrap_err().to_string().contains("base_url"),
            "should mention base_url"
        );
    }

    #[test]
    fn require_base_url_present() {
        let backend = RigBackend::new(config(
            ProviderName::OpenAICompatible,
            Some("key"),
            Some("http://localhost:11434/v1"),
        ))
        .unwrap();
        assert_eq!(backend.require_base_url().unwrap(), "http://localhost:11434/v1");
    }

    #[tokio::test]
    async fn openai_compatible_without_base_url_fails_before_network() {
        let backend =
            RigBackend::new(config(ProviderName::OpenAICompatible, Some("key"), None)).unwrap();
        let request = GenerationRequest {
            model: "llama3",
            system: "system",
            prompt: "hello",
            temperature: 0.7,
            max_tokens: 16,
        };
        let err = backend.generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn classify_error_rate_limit() {
        let err = ProviderError::ApiError(
            "Gemini API error: HttpError: Invalid status code 429 Too Many Requests".into(),
        );
        assert_eq!(classify_error(&err), Some("Rate limited by API"));
    }

    #[test]
    fn classify_error_503_unavailable() {
        let err = ProviderError::ApiError(
            "Gemini API error: HttpError: Invalid status code 503 Service Unavailable".into(),
        );
        assert_eq!(classify_error(&err), Some("High model load"));
    }

    #[test]
    fn classify_error_overloaded() {
        let err = ProviderError::ApiError("Anthropic API error: overloaded".into());
        assert_eq!(classify_error(&err), Some("API overloaded"));
    }

    #[test]
    fn classify_error_502_gateway() {
        let err = ProviderError::ApiError("HTTP 502 Bad Gateway".into());
        assert_eq!(classify_error(&err), Some("API gateway error"));
    }

    #[test]
    fn classify_error_timeout() {
        let err = ProviderError::ApiError("request timed out after 30s".into());
        assert_eq!(classify_error(&err), Some("Request timed out"));
    }

    #[test]
    fn classify_error_connection() {
        let err = ProviderError::ApiError("connection refused".into());
        assert_eq!(classify_error(&err), Some("Connection error"));
    }

    #[test]
    fn classify_error_auth_is_not_transient() {
        let err = ProviderError::ApiError("Invalid API key: 401 Unauthorized".into());
        assert_eq!(classify_error(&err), None);
    }

    #[test]
    fn classify_error_not_configured() {
        let err = ProviderError::NotConfigured("missing key".into());
        assert_eq!(classify_error(&err), None);
    }

    #[test]
    fn classify_error_empty_response() {
        assert_eq!(
            classify_error(&ProviderError::EmptyResponse),
            Some("Empty model response")
        );
    }
}
