//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and URLs so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "commet";

/// Crate version baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compilation target triple (set by `build.rs`).
pub const TARGET: &str = env!("TARGET");

/// User agent sent with every hosting API request.
pub const USER_AGENT: &str = concat!("commet/", env!("CARGO_PKG_VERSION"));

/// Local config filename (e.g. `.commet.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".commet.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "commet";

/// Default GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub REST API version header value.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Footer shown under AI answers in terminal output.
pub const AI_DISCLOSURE: &str = "Answer generated by an AI model from recent commit data.";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "COMMET_PROVIDER";
pub const ENV_MODEL: &str = "COMMET_MODEL";
pub const ENV_API_KEY: &str = "COMMET_API_KEY";
pub const ENV_BASE_URL: &str = "COMMET_BASE_URL";
pub const ENV_GITHUB_TOKEN: &str = "COMMET_GITHUB_TOKEN";
pub const ENV_GITHUB_TOKEN_FALLBACK: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_API_URL: &str = "COMMET_GITHUB_API_URL";
pub const ENV_LOG: &str = "COMMET_LOG";
