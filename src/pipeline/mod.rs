//! Analysis pipeline: fetch, normalize, assemble, and answer.
//!
//! [`Analyzer`] is the inbound surface. Per-commit file changes are fetched
//! concurrently under a semaphore and slotted back by index, so the result
//! never depends on completion order. Dropping a returned future aborts all
//! in-flight fetches; nothing partial is ever returned.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::aggregate::assemble;
use crate::error::AnalysisError;
use crate::hosting::{
    HostingProvider, RawCommit, RawFileChange, validate_branch, validate_full_name,
    validate_limit,
};
use crate::models::{
    AnalysisSnapshot, Branch, CommitStory, MultiRepoExchange, QaExchange, StoryStyle,
};
use crate::normalize::normalize;
use crate::session::{QaSession, validate_repository_count};

/// Pipeline knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Upper bound on concurrent per-commit file-change fetches.
    pub max_concurrent_fetches: usize,
    /// Commits fetched when the caller gives no limit.
    pub default_limit: usize,
    /// Fetch per-commit file changes (one request per commit).
    pub with_file_changes: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 4,
            default_limit: 10,
            with_file_changes: true,
        }
    }
}

/// Runs analyses and questions against a hosting provider.
///
/// Holds no state between calls: concurrent identical requests each fetch
/// independently. Clones share the hosting provider and backend.
#[derive(Clone)]
pub struct Analyzer {
    hosting: Arc<dyn HostingProvider>,
    session: Option<QaSession>,
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(hosting: Arc<dyn HostingProvider>, options: AnalyzerOptions) -> Self {
        Self {
            hosting,
            session: None,
            options,
        }
    }

    /// Attach a session for [`Analyzer::request_chat`], [`Analyzer::request_multi_chat`],
    /// and [`Analyzer::request_story`].
    pub fn with_session(mut self, session: QaSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Fetch and assemble a snapshot of `repository`.
    ///
    /// `branch` defaults to the repository's default branch; `limit`
    /// defaults to [`AnalyzerOptions::default_limit`].
    pub async fn request_analysis(
        &self,
        repository: &str,
        branch: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Arc<AnalysisSnapshot>, AnalysisError> {
        validate_full_name(repository)?;
        if let Some(branch) = branch {
            validate_branch(branch)?;
        }
        validate_limit(limit)?;
        let limit = limit.unwrap_or(self.options.default_limit);

        tracing::info!(%repository, branch = branch.unwrap_or("<default>"), limit, "starting analysis");

        let (repo, branch, page) = match branch {
            Some(branch) => {
                let (repo, page) = tokio::try_join!(
                    self.hosting.fetch_repository(repository),
                    self.hosting.fetch_commits(repository, branch, Some(limit)),
                )?;
                (repo, branch.to_string(), page)
            }
            None => {
                let repo = self.hosting.fetch_repository(repository).await?;
                let branch = repo.default_branch.clone();
                let page = self
                    .hosting
                    .fetch_commits(repository, &branch, Some(limit))
                    .await?;
                (repo, branch, page)
            }
        };

        let files: Vec<Option<Vec<RawFileChange>>> = if self.options.with_file_changes {
            self.fetch_file_changes(repository, &page.commits)
                .await?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; page.commits.len()]
        };

        let normalized = page
            .commits
            .iter()
            .zip(&files)
            .map(|(raw, files)| normalize(raw, files.as_deref()))
            .collect();

        let snapshot = assemble(
            repo,
            &branch,
            normalized,
            limit,
            page.total_available,
            Utc::now(),
        )?;

        for anomaly in snapshot.anomalies() {
            tracing::debug!(%anomaly, "normalization anomaly");
        }
        tracing::info!(
            %repository,
            %branch,
            commits = snapshot.commits().len(),
            total = snapshot.total_commits(),
            anomalies = snapshot.anomalies().len(),
            "analysis complete"
        );

        Ok(Arc::new(snapshot))
    }

    /// Analyze with `limit = commits_limit`, then answer `question`.
    pub async fn request_chat(
        &self,
        question: &str,
        repository: &str,
        branch: Option<&str>,
        commits_limit: Option<usize>,
        model: &str,
    ) -> Result<QaExchange, AnalysisError> {
        let session = self.session()?;
        if question.trim().is_empty() {
            return Err(AnalysisError::validation("question must not be empty"));
        }

        let requested = commits_limit.unwrap_or(self.options.default_limit);
        let snapshot = self
            .request_analysis(repository, branch, commits_limit)
            .await?;
        // The branch may hold fewer commits than requested.
        let mut exchange = session
            .ask(question, &snapshot, snapshot.commits().len(), model)
            .await?;
        exchange.requested_commits = requested;
        Ok(exchange)
    }

    /// Analyze every repository on its default branch, concurrently, then
    /// answer `question` over all of them at once.
    ///
    /// `per_repo_commits` bounds both the fetch and the context for each
    /// repository. The first failing analysis aborts the others.
    pub async fn request_multi_chat(
        &self,
        question: &str,
        repositories: &[String],
        per_repo_commits: Option<usize>,
        model: &str,
    ) -> Result<MultiRepoExchange, AnalysisError> {
        let session = self.session()?;
        if question.trim().is_empty() {
            return Err(AnalysisError::validation("question must not be empty"));
        }
        for repository in repositories {
            validate_full_name(repository)?;
        }
        validate_repository_count(repositories.iter().map(String::as_str))?;
        validate_limit(per_repo_commits)?;
        let per_repo = per_repo_commits.unwrap_or(self.options.default_limit);

        tracing::info!(repositories = repositories.len(), per_repo, "starting multi-repository analysis");

        let mut join_set = JoinSet::new();
        for (idx, repository) in repositories.iter().enumerate() {
            let analyzer = self.clone();
            let repository = repository.clone();
            join_set.spawn(async move {
                let result = analyzer
                    .request_analysis(&repository, None, Some(per_repo))
                    .await;
                (idx, result)
            });
        }

        let mut slots: Vec<Option<Arc<AnalysisSnapshot>>> = vec![None; repositories.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, Ok(snapshot))) => slots[idx] = Some(snapshot),
                Ok((idx, Err(e))) => {
                    tracing::debug!(repository = %repositories[idx], error = %e, "analysis failed, aborting the rest");
                    join_set.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    join_set.abort_all();
                    return Err(AnalysisError::Transport(format!(
                        "repository analysis task failed: {e}"
                    )));
                }
            }
        }

        let snapshots: Vec<Arc<AnalysisSnapshot>> = slots.into_iter().flatten().collect();
        session
            .ask_many(question, &snapshots, per_repo, model)
            .await
    }

    /// Analyze, then summarize the fetched commit history.
    pub async fn request_story(
        &self,
        repository: &str,
        branch: Option<&str>,
        limit: Option<usize>,
        style: StoryStyle,
        model: &str,
    ) -> Result<CommitStory, AnalysisError> {
        let session = self.session()?;
        let snapshot = self.request_analysis(repository, branch, limit).await?;
        session.story(&snapshot, style, model).await
    }

    /// List the branches of `repository`.
    pub async fn list_branches(&self, repository: &str) -> Result<Vec<Branch>, AnalysisError> {
        validate_full_name(repository)?;
        self.hosting.fetch_branches(repository).await
    }

    fn session(&self) -> Result<&QaSession, AnalysisError> {
        self.session.as_ref().ok_or_else(|| {
            AnalysisError::ModelUnavailable("no answer backend configured".to_string())
        })
    }

    /// Fetch file changes for every commit, at most
    /// `max_concurrent_fetches` at a time. Results are in commit order.
    async fn fetch_file_changes(
        &self,
        repository: &str,
        commits: &[RawCommit],
    ) -> Result<Vec<Vec<RawFileChange>>, AnalysisError> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_fetches.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, commit) in commits.iter().enumerate() {
            let hosting = Arc::clone(&self.hosting);
            let sem = Arc::clone(&semaphore);
            let repository = repository.to_string();
            let sha = commit.sha.clone();

            join_set.spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => hosting.fetch_file_changes(&repository, &sha).await,
                    Err(_) => Err(AnalysisError::Transport(
                        "file-change fetch pool closed".to_string(),
                    )),
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<Vec<RawFileChange>>> = vec![None; commits.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, Ok(files))) => slots[idx] = Some(files),
                Ok((idx, Err(e))) => {
                    tracing::debug!(sha = %commits[idx].sha, error = %e, "file-change fetch failed, aborting analysis");
                    join_set.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    join_set.abort_all();
                    return Err(AnalysisError::Transport(format!(
                        "file-change fetch task failed: {e}"
                    )));
                }
            }
        }

        Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
    }
}
