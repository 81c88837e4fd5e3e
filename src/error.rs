//! Error taxonomy shared by every pipeline stage.
//!
//! Each failure keeps its kind all the way to the caller so a UI can choose
//! between a retry affordance (rate limiting, transport) and a
//! re-authentication affordance (unauthorized).

use std::time::Duration;

use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// Errors produced by the analysis pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The repository or branch does not exist (or is invisible to the caller).
    #[error("not found: {0}")]
    NotFound(String),

    /// The branch exists but has no commits.
    #[error("branch '{branch}' of {repository} has no commits")]
    EmptyBranch { repository: String, branch: String },

    /// A credential is missing or was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The hosting provider is throttling requests.
    #[error("rate limited by hosting provider{}", format_retry_after(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// The answer backend failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Malformed caller input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Network or decoding failure that does not map to a more specific kind.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    EmptyBranch,
    Unauthorized,
    RateLimited,
    ModelUnavailable,
    Validation,
    Transport,
}

impl AnalysisError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::NotFound(_) => ErrorKind::NotFound,
            AnalysisError::EmptyBranch { .. } => ErrorKind::EmptyBranch,
            AnalysisError::Unauthorized(_) => ErrorKind::Unauthorized,
            AnalysisError::RateLimited { .. } => ErrorKind::RateLimited,
            AnalysisError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            AnalysisError::Validation(_) => ErrorKind::Validation,
            AnalysisError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::RateLimited { .. } | AnalysisError::Transport(_)
        )
    }

    /// Advisory delay before retrying, when the provider supplied one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AnalysisError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        AnalysisError::Validation(msg.into())
    }
}

fn format_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_preserved_for_every_variant() {
        let cases = [
            (AnalysisError::NotFound("x".into()), ErrorKind::NotFound),
            (
                AnalysisError::EmptyBranch {
                    repository: "octo/demo".into(),
                    branch: "main".into(),
                },
                ErrorKind::EmptyBranch,
            ),
            (AnalysisError::Unauthorized("x".into()), ErrorKind::Unauthorized),
            (
                AnalysisError::RateLimited { retry_after: None },
                ErrorKind::RateLimited,
            ),
            (
                AnalysisError::ModelUnavailable("x".into()),
                ErrorKind::ModelUnavailable,
            ),
            (AnalysisError::Validation("x".into()), ErrorKind::Validation),
            (AnalysisError::Transport("x".into()), ErrorKind::Transport),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "wrong kind for {err}");
        }
    }

    #[test]
    fn rate_limited_message_includes_retry_after() {
        let err = AnalysisError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        };
        assert_eq!(
            err.to_string(),
            "rate limited by hosting provider (retry after 42s)"
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
    }

    #[test]
    fn rate_limited_message_without_retry_after() {
        let err = AnalysisError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "rate limited by hosting provider");
    }

    #[test]
    fn retryable_kinds() {
        assert!(AnalysisError::Transport("reset".into()).is_retryable());
        assert!(AnalysisError::RateLimited { retry_after: None }.is_retryable());
        assert!(!AnalysisError::Unauthorized("bad token".into()).is_retryable());
        assert!(!AnalysisError::validation("empty question").is_retryable());
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(ErrorKind::EmptyBranch.to_string(), "empty_branch");
        assert_eq!(ErrorKind::ModelUnavailable.to_string(), "model_unavailable");
    }
}
