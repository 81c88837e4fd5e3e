//! Question answering over analysis snapshots.
//!
//! A [`QaSession`] binds each answer to the snapshot (or snapshots) and
//! commit count it was computed from. It never fetches and never retries:
//! one backend call per question.

pub mod prompt;

use std::sync::Arc;

use crate::context::{ContextOptions, build_context, build_multi_context};
use crate::error::AnalysisError;
use crate::models::{AnalysisSnapshot, CommitStory, MultiRepoExchange, QaExchange, StoryStyle};
use crate::providers::{AnswerBackend, GenerationRequest};

/// Sampling temperature for repository questions.
pub const QA_TEMPERATURE: f64 = 0.7;

/// Response token cap for repository questions.
pub const QA_MAX_TOKENS: u64 = 1000;

/// Response token cap for questions spanning several repositories.
pub const MULTI_QA_MAX_TOKENS: u64 = 2000;

/// Most repositories a single question may span.
pub const MAX_REPOSITORIES: usize = 10;

/// Sampling temperature for commit stories.
pub const STORY_TEMPERATURE: f64 = 0.8;

/// Response token cap for commit stories.
pub const STORY_MAX_TOKENS: u64 = 500;

/// Answers questions about snapshots through an [`AnswerBackend`].
#[derive(Clone)]
pub struct QaSession {
    backend: Arc<dyn AnswerBackend>,
    context: ContextOptions,
}

impl QaSession {
    pub fn new(backend: Arc<dyn AnswerBackend>, context: ContextOptions) -> Self {
        Self { backend, context }
    }

    /// Answer `question` from the `commits_limit` most recent commits of `snapshot`.
    ///
    /// `commits_limit` must be between 1 and the snapshot's commit count;
    /// it is never clamped.
    pub async fn ask(
        &self,
        question: &str,
        snapshot: &Arc<AnalysisSnapshot>,
        commits_limit: usize,
        model: &str,
    ) -> Result<QaExchange, AnalysisError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnalysisError::validation("question must not be empty"));
        }
        let available = snapshot.commits().len();
        if commits_limit == 0 || commits_limit > available {
            return Err(AnalysisError::validation(format!(
                "commits_limit must be between 1 and {available}, got {commits_limit}"
            )));
        }
        let model = validate_model(model)?;

        let doc = build_context(snapshot, commits_limit, &self.context);
        let user_prompt = prompt::question_prompt(&doc.text, question);
        let request = GenerationRequest {
            model,
            system: prompt::ANALYST_SYSTEM_PROMPT,
            prompt: &user_prompt,
            temperature: QA_TEMPERATURE,
            max_tokens: QA_MAX_TOKENS,
        };

        tracing::info!(
            repository = %snapshot.repository().full_name,
            commits = doc.commits_included,
            context_chars = doc.char_count,
            truncated = doc.truncated,
            %model,
            "asking question"
        );
        let answer = self.backend.generate(&request).await?;

        Ok(QaExchange {
            question: question.to_string(),
            snapshot: Arc::clone(snapshot),
            commits_analyzed: doc.commits_included,
            commits_limit,
            requested_commits: commits_limit,
            model: model.to_string(),
            answer,
            context_truncated: doc.truncated,
            context_fingerprint: doc.fingerprint(),
        })
    }

    /// Answer `question` from the `per_repo_commits` most recent commits of
    /// each snapshot, in one backend call.
    ///
    /// Snapshots with fewer commits contribute all of theirs. The same
    /// repository may not appear twice.
    pub async fn ask_many(
        &self,
        question: &str,
        snapshots: &[Arc<AnalysisSnapshot>],
        per_repo_commits: usize,
        model: &str,
    ) -> Result<MultiRepoExchange, AnalysisError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnalysisError::validation("question must not be empty"));
        }
        validate_repository_count(snapshots.iter().map(|s| s.repository().full_name.as_str()))?;
        if per_repo_commits == 0 {
            return Err(AnalysisError::validation(
                "per-repository commit count must be positive",
            ));
        }
        let model = validate_model(model)?;

        let doc = build_multi_context(snapshots, per_repo_commits, &self.context);
        let user_prompt = prompt::multi_question_prompt(&doc.text, question);
        let request = GenerationRequest {
            model,
            system: prompt::ARCHITECT_SYSTEM_PROMPT,
            prompt: &user_prompt,
            temperature: QA_TEMPERATURE,
            max_tokens: MULTI_QA_MAX_TOKENS,
        };

        tracing::info!(
            repositories = snapshots.len(),
            commits = doc.commits_included,
            context_chars = doc.char_count,
            truncated = doc.truncated,
            %model,
            "asking question across repositories"
        );
        let answer = self.backend.generate(&request).await?;

        Ok(MultiRepoExchange {
            question: question.to_string(),
            snapshots: snapshots.to_vec(),
            per_repo_commits,
            commits_analyzed: doc.commits_included,
            model: model.to_string(),
            answer,
            context_truncated: doc.truncated,
            context_fingerprint: doc.fingerprint(),
        })
    }

    /// Summarize the snapshot's whole commit history in the given style.
    pub async fn story(
        &self,
        snapshot: &Arc<AnalysisSnapshot>,
        style: StoryStyle,
        model: &str,
    ) -> Result<CommitStory, AnalysisError> {
        let model = validate_model(model)?;

        let options = ContextOptions {
            include_patches: false,
            ..self.context
        };
        let doc = build_context(snapshot, snapshot.commits().len(), &options);
        let system = prompt::story_system_prompt(style);
        let user_prompt = prompt::story_prompt(&doc.text, style);
        let request = GenerationRequest {
            model,
            system: &system,
            prompt: &user_prompt,
            temperature: STORY_TEMPERATURE,
            max_tokens: STORY_MAX_TOKENS,
        };

        tracing::info!(
            repository = %snapshot.repository().full_name,
            commits = doc.commits_included,
            %style,
            %model,
            "generating commit story"
        );
        let story = self.backend.generate(&request).await?;

        Ok(CommitStory {
            style,
            snapshot: Arc::clone(snapshot),
            commits_analyzed: doc.commits_included,
            model: model.to_string(),
            story,
        })
    }
}

/// Between one and [`MAX_REPOSITORIES`] distinct repositories.
pub fn validate_repository_count<'a>(
    full_names: impl IntoIterator<Item = &'a str>,
) -> Result<(), AnalysisError> {
    let mut seen = Vec::new();
    for name in full_names {
        let key = name.to_lowercase();
        if seen.contains(&key) {
            return Err(AnalysisError::validation(format!(
                "repository {name} is listed more than once"
            )));
        }
        seen.push(key);
    }
    match seen.len() {
        0 => Err(AnalysisError::validation("at least one repository is required")),
        n if n > MAX_REPOSITORIES => Err(AnalysisError::validation(format!(
            "at most {MAX_REPOSITORIES} repositories per question, got {n}"
        ))),
        _ => Ok(()),
    }
}

fn validate_model(model: &str) -> Result<&str, AnalysisError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(AnalysisError::validation("model identifier must not be empty"));
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::aggregate::assemble;
    use crate::aggregate::test_support::*;
    use crate::error::ErrorKind;
    use crate::providers::ProviderError;

    /// Records every request and replies with a canned result.
    struct RecordingBackend {
        reply: Result<String, ProviderError>,
        seen: Mutex<Vec<(String, String, String, f64)>>,
    }

    impl RecordingBackend {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AnswerBackend for RecordingBackend {
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().push((
                request.model.to_string(),
                request.system.to_string(),
                request.prompt.to_string(),
                request.temperature,
            ));
            self.reply.clone()
        }
    }

    fn snapshot_of(n: usize) -> Arc<AnalysisSnapshot> {
        let commits = (0..n)
            .map(|i| normalized(commit_at(&format!("{i:040x}"), 1_000 + i as i64, &format!("Commit {i}"))))
            .collect();
        Arc::new(
            assemble(
                repository("octo/demo"),
                "main",
                commits,
                n.max(1),
                n,
                Utc.timestamp_opt(2_000_000_000, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn ask_bounds_context_to_commits_limit() {
        let backend = RecordingBackend::answering("Three commits changed things.");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshot = snapshot_of(10);

        let exchange = session
            .ask("What changed recently?", &snapshot, 3, "gpt-x")
            .await
            .unwrap();

        assert_eq!(exchange.commits_analyzed, 3);
        assert_eq!(exchange.commits_limit, 3);
        assert_eq!(exchange.requested_commits, 3);
        assert_eq!(exchange.model, "gpt-x");
        assert_eq!(exchange.answer, "Three commits changed things.");
        assert!(Arc::ptr_eq(&exchange.snapshot, &snapshot));
        assert!(!exchange.context_truncated);
        assert_eq!(backend.calls(), 1);

        let seen = backend.seen.lock().unwrap();
        let (model, system, prompt, temperature) = &seen[0];
        assert_eq!(model, "gpt-x");
        assert_eq!(system, prompt::ANALYST_SYSTEM_PROMPT);
        assert_eq!(*temperature, QA_TEMPERATURE);
        assert!(prompt.contains("What changed recently?"));
        assert!(prompt.contains("Commit 9"), "newest commit is included");
        assert!(!prompt.contains("Commit 6"), "fourth-newest commit is excluded");
    }

    #[tokio::test]
    async fn ask_rejects_limit_beyond_snapshot() {
        let backend = RecordingBackend::answering("unused");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshot = snapshot_of(5);

        let err = session.ask("Why?", &snapshot, 6, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = session.ask("Why?", &snapshot, 0, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn ask_rejects_blank_question_and_model() {
        let backend = RecordingBackend::answering("unused");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshot = snapshot_of(2);

        let err = session.ask("   ", &snapshot, 1, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = session.ask("Why?", &snapshot, 1, " ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn backend_failure_is_model_unavailable_without_retry() {
        let backend = RecordingBackend::failing(ProviderError::ApiError(
            "OpenAI API error: 503 Service Unavailable".into(),
        ));
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshot = snapshot_of(3);

        let err = session.ask("Why?", &snapshot, 3, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn identical_questions_see_identical_context() {
        let backend = RecordingBackend::answering("ok");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshot = snapshot_of(4);

        let a = session.ask("Same?", &snapshot, 4, "gpt-x").await.unwrap();
        let b = session.ask("Same?", &snapshot, 4, "gpt-x").await.unwrap();
        assert_eq!(a.context_fingerprint, b.context_fingerprint);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].2, seen[1].2);
    }

    fn named_snapshot(full_name: &str, n: usize) -> Arc<AnalysisSnapshot> {
        let commits = (0..n)
            .map(|i| {
                normalized(commit_at(
                    &format!("{i:040x}"),
                    1_000 + i as i64,
                    &format!("{full_name} change {i}"),
                ))
            })
            .collect();
        Arc::new(
            assemble(
                repository(full_name),
                "main",
                commits,
                n.max(1),
                n,
                Utc.timestamp_opt(2_000_000_000, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn ask_many_spans_every_repository_in_one_call() {
        let backend = RecordingBackend::answering("The client calls the API.");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshots = vec![named_snapshot("octo/web", 5), named_snapshot("octo/api", 2)];

        let exchange = session
            .ask_many("How do they connect?", &snapshots, 3, "gpt-x")
            .await
            .unwrap();

        assert_eq!(exchange.commits_analyzed, 5);
        assert_eq!(exchange.per_repo_commits, 3);
        assert_eq!(exchange.snapshots.len(), 2);
        assert!(Arc::ptr_eq(&exchange.snapshots[1], &snapshots[1]));
        assert_eq!(backend.calls(), 1);

        let seen = backend.seen.lock().unwrap();
        let (_, system, prompt, _) = &seen[0];
        assert_eq!(system, prompt::ARCHITECT_SYSTEM_PROMPT);
        assert!(prompt.contains("=== REPOSITORY 1: web ==="));
        assert!(prompt.contains("=== REPOSITORY 2: api ==="));
        assert!(prompt.contains("octo/web change 4"));
        assert!(!prompt.contains("octo/web change 1"));
        assert!(prompt.contains("octo/api change 0"));
    }

    #[tokio::test]
    async fn ask_many_validates_before_calling_the_backend() {
        let backend = RecordingBackend::answering("unused");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let web = named_snapshot("octo/web", 2);

        let err = session.ask_many("Why?", &[], 1, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let twice = vec![Arc::clone(&web), Arc::clone(&web)];
        let err = session.ask_many("Why?", &twice, 1, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = session
            .ask_many("Why?", &[Arc::clone(&web)], 0, "gpt-x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = session.ask_many(" ", &[web], 1, "gpt-x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn repository_count_is_bounded() {
        let names: Vec<String> = (0..=MAX_REPOSITORIES).map(|i| format!("octo/r{i}")).collect();
        let err = validate_repository_count(names.iter().map(String::as_str)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(validate_repository_count(names[..MAX_REPOSITORIES].iter().map(String::as_str)).is_ok());
        assert!(validate_repository_count(["octo/A", "octo/a"]).is_err());
    }

    #[tokio::test]
    async fn story_covers_all_commits_without_patches() {
        let backend = RecordingBackend::answering("The team shipped a parser.");
        let session = QaSession::new(backend.clone(), ContextOptions::default());
        let snapshot = snapshot_of(6);

        let story = session
            .story(&snapshot, StoryStyle::Technical, "gpt-x")
            .await
            .unwrap();
        assert_eq!(story.commits_analyzed, 6);
        assert_eq!(story.style, StoryStyle::Technical);
        assert_eq!(story.story, "The team shipped a parser.");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].3, STORY_TEMPERATURE);
        assert!(!seen[0].2.contains("Code Changes"));
    }
}
