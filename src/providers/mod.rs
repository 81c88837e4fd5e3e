//! AnswerBackend trait and LLM integration.
//!
//! Provides an abstraction layer over rig-core to decouple the
//! codebase from the specific LLM library.

pub mod rig;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AnalysisError;

/// Errors from the answer backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl From<ProviderError> for AnalysisError {
    fn from(err: ProviderError) -> Self {
        match rig::classify_error(&err) {
            Some(hint) => AnalysisError::ModelUnavailable(format!("{hint}: {err}")),
            None => AnalysisError::ModelUnavailable(err.to_string()),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: u64,
}

/// Trait for LLM-backed text generation.
///
/// Implementations make exactly one completion call per `generate`;
/// retrying is the caller's decision.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Generate a completion and return the response text.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn provider_errors_become_model_unavailable() {
        let err: AnalysisError = ProviderError::NotConfigured("missing key".into()).into();
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
        assert!(err.to_string().contains("missing key"));
    }

    #[test]
    fn transient_provider_errors_carry_a_hint() {
        let err: AnalysisError =
            ProviderError::ApiError("OpenAI API error: 429 Too Many Requests".into()).into();
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
        assert!(err.to_string().contains("Rate limited by API"), "got: {err}");
    }
}
