//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.commet.toml` in the working directory
//! 4. `~/.config/commet/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    ENV_API_KEY, ENV_BASE_URL, ENV_GITHUB_API_URL, ENV_GITHUB_TOKEN, ENV_GITHUB_TOKEN_FALLBACK,
    ENV_MODEL, ENV_PROVIDER, GITHUB_API_URL,
};
use crate::context::{ContextOptions, DEFAULT_CHAR_BUDGET, DEFAULT_MAX_PATCH_LINES};
use crate::env::Env;
use crate::hosting::RetryPolicy;
use crate::models::ProviderName;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub hosting: HostingConfig,
    pub context: ContextConfig,
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::OpenAI,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Hosting provider (GitHub) client configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostingConfig {
    pub api_url: String,
    pub token: Option<String>,
    /// Commits requested per page (GitHub caps this at 100).
    pub page_size: usize,
    /// Concurrent per-commit file-change fetches.
    pub max_concurrent_fetches: usize,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HostingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostingConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            token: None,
            page_size: 100,
            max_concurrent_fetches: 4,
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            timeout_secs: 30,
        }
    }
}

impl HostingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Context document configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Upper bound on the context document, in characters.
    pub char_budget: usize,
    pub max_patch_lines: usize,
    /// Commits fetched when no limit is given.
    pub default_commits: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            char_budget: DEFAULT_CHAR_BUDGET,
            max_patch_lines: DEFAULT_MAX_PATCH_LINES,
            default_commits: 10,
        }
    }
}

impl ContextConfig {
    pub fn options(&self) -> ContextOptions {
        ContextOptions {
            char_budget: self.char_budget,
            max_patch_lines: self.max_patch_lines,
            include_patches: true,
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, working-directory config, then applies
    /// environment variable overrides.
    pub fn load(work_dir: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: local config
        if let Some(dir) = work_dir {
            let local_path = dir.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "loading config file");
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for non-default values).
    fn merge(&mut self, other: Config) {
        // Provider settings
        let default_provider = ProviderConfig::default();
        if other.provider.name != default_provider.name {
            self.provider.name = other.provider.name;
        }
        if other.provider.model != default_provider.model {
            self.provider.model = other.provider.model;
        }
        if other.provider.base_url.is_some() {
            self.provider.base_url = other.provider.base_url;
        }
        if other.provider.api_key.is_some() {
            self.provider.api_key = other.provider.api_key;
        }

        // Hosting settings
        let default_hosting = HostingConfig::default();
        if other.hosting.api_url != default_hosting.api_url {
            self.hosting.api_url = other.hosting.api_url;
        }
        if other.hosting.token.is_some() {
            self.hosting.token = other.hosting.token;
        }
        if other.hosting.page_size != default_hosting.page_size {
            self.hosting.page_size = other.hosting.page_size;
        }
        if other.hosting.max_concurrent_fetches != default_hosting.max_concurrent_fetches {
            self.hosting.max_concurrent_fetches = other.hosting.max_concurrent_fetches;
        }
        if other.hosting.max_retries != default_hosting.max_retries {
            self.hosting.max_retries = other.hosting.max_retries;
        }
        if other.hosting.initial_backoff_ms != default_hosting.initial_backoff_ms {
            self.hosting.initial_backoff_ms = other.hosting.initial_backoff_ms;
        }
        if other.hosting.max_backoff_ms != default_hosting.max_backoff_ms {
            self.hosting.max_backoff_ms = other.hosting.max_backoff_ms;
        }
        if other.hosting.timeout_secs != default_hosting.timeout_secs {
            self.hosting.timeout_secs = other.hosting.timeout_secs;
        }

        // Context settings
        let default_context = ContextConfig::default();
        if other.context.char_budget != default_context.char_budget {
            self.context.char_budget = other.context.char_budget;
        }
        if other.context.max_patch_lines != default_context.max_patch_lines {
            self.context.max_patch_lines = other.context.max_patch_lines;
        }
        if other.context.default_commits != default_context.default_commits {
            self.context.default_commits = other.context.default_commits;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(val) = env.var(ENV_PROVIDER) {
            if let Ok(name) = val.parse::<ProviderName>() {
                self.provider.name = name;
            } else {
                tracing::warn!("ignoring invalid {ENV_PROVIDER} value: {val}");
            }
        }
        if let Ok(val) = env.var(ENV_MODEL) {
            self.provider.model = val;
        }
        if let Ok(val) = env.var(ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env.first_of(&[ENV_API_KEY, self.provider.name.api_key_env_var()]);
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }

        let token = env.first_of(&[ENV_GITHUB_TOKEN, ENV_GITHUB_TOKEN_FALLBACK]);
        if token.is_some() {
            self.hosting.token = token;
        }
        if let Ok(val) = env.var(ENV_GITHUB_API_URL) {
            self.hosting.api_url = val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.hosting.api_url, "https://api.github.com");
        assert_eq!(config.hosting.max_retries, 2);
        assert_eq!(config.context.char_budget, 24_000);
        assert_eq!(config.context.default_commits, 10);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[provider]
name = "anthropic"
model = "claude-sonnet-4-20250514"

[hosting]
api_url = "https://ghe.example.com/api/v3"
max_concurrent_fetches = 8

[context]
char_budget = 12000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.hosting.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.hosting.max_concurrent_fetches, 8);
        assert_eq!(config.hosting.page_size, 100, "unset fields keep defaults");
        assert_eq!(config.context.char_budget, 12_000);
        assert_eq!(config.context.max_patch_lines, 200);
    }

    #[test]
    fn merge_overrides_non_default_values() {
        let mut base = Config::default();
        let mut other = Config::default();

        other.provider.name = ProviderName::Groq;
        other.provider.model = "llama-3.3-70b".to_string();
        other.provider.base_url = Some("https://custom.api".to_string());
        other.provider.api_key = Some("sk-test".to_string());
        other.hosting.token = Some("ghp_test".to_string());
        other.hosting.page_size = 50;
        other.hosting.max_retries = 0;
        other.hosting.timeout_secs = 5;
        other.context.char_budget = 8_000;
        other.context.default_commits = 25;

        base.merge(other);

        assert_eq!(base.provider.name, ProviderName::Groq);
        assert_eq!(base.provider.model, "llama-3.3-70b");
        assert_eq!(base.provider.base_url, Some("https://custom.api".to_string()));
        assert_eq!(base.provider.api_key, Some("sk-test".to_string()));
        assert_eq!(base.hosting.token, Some("ghp_test".to_string()));
        assert_eq!(base.hosting.page_size, 50);
        assert_eq!(base.hosting.max_retries, 0);
        assert_eq!(base.hosting.timeout_secs, 5);
        assert_eq!(base.context.char_budget, 8_000);
        assert_eq!(base.context.default_commits, 25);
    }

    #[test]
    fn merge_keeps_base_when_other_is_default() {
        let mut base = Config::default();
        base.provider.model = "gpt-4o".to_string();
        base.hosting.max_concurrent_fetches = 2;

        base.merge(Config::default());

        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.hosting.max_concurrent_fetches, 2);
    }

    #[test]
    fn load_file_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{ toml").unwrap();

        let result = Config::load_file(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("parse"));
    }

    #[test]
    fn load_file_not_found() {
        let result = Config::load_file(Path::new("/tmp/commet_not_exist_config.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read"));
    }

    #[test]
    fn load_from_work_dir() {
        let env = Env::mock(Vec::<(&str, &str)>::new());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".commet.toml"),
            r#"
[provider]
model = "gpt-4o"

[context]
default_commits = 30
"#,
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), &env).unwrap();
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.context.default_commits, 30);
    }

    #[test]
    fn env_overrides_local_file() {
        let env = Env::mock([("COMMET_MODEL", "gpt-4.1")]);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".commet.toml"),
            "[provider]\nmodel = \"gpt-4o\"\n",
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), &env).unwrap();
        assert_eq!(config.provider.model, "gpt-4.1");
    }

    #[test]
    fn apply_env_vars_provider_and_api_key() {
        let env = Env::mock([
            ("COMMET_PROVIDER", "anthropic"),
            ("COMMET_API_KEY", "sk-env-test"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.provider.api_key, Some("sk-env-test".to_string()));
    }

    #[test]
    fn apply_env_vars_provider_specific_api_key_fallback() {
        let env = Env::mock([("OPENAI_API_KEY", "sk-openai-test")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.api_key, Some("sk-openai-test".to_string()));
    }

    #[test]
    fn apply_env_vars_invalid_provider_falls_back() {
        let env = Env::mock([("COMMET_PROVIDER", "not-a-provider")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::OpenAI);
    }

    #[test]
    fn github_token_prefers_app_specific_var() {
        let env = Env::mock([
            ("COMMET_GITHUB_TOKEN", "ghp_app"),
            ("GITHUB_TOKEN", "ghp_generic"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.hosting.token, Some("ghp_app".to_string()));

        let env = Env::mock([("GITHUB_TOKEN", "ghp_generic")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.hosting.token, Some("ghp_generic".to_string()));
    }

    #[test]
    fn empty_github_token_is_ignored() {
        let env = Env::mock([("GITHUB_TOKEN", "")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.hosting.token, None);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = Config::default();
        config.provider.api_key = Some("sk-secret".to_string());
        config.hosting.token = Some("ghp_secret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn retry_policy_from_config() {
        let policy = HostingConfig::default().retry_policy();
        assert_eq!(policy, RetryPolicy::default());
    }
}
