//! Clap argument types and repository argument parsing.

use clap::{Args, Parser, ValueEnum};

use commet::hosting::parse_repository;
use commet::models::StoryStyle;

/// Ask questions about a GitHub repository's recent commit history.
#[derive(Parser, Debug)]
#[command(name = "commet", version = commet::constants::VERSION)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, default_value = "terminal")]
    pub format: OutputFormat,

    /// GitHub token (overrides COMMET_GITHUB_TOKEN and GITHUB_TOKEN).
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Suppress status messages on stderr.
    #[arg(long, short = 'q', global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Show repository metadata, recent commits, and activity statistics.
    Analyze(AnalyzeArgs),

    /// Ask a question about a repository's recent commits.
    Ask(AskArgs),

    /// Ask one question across several repositories.
    AskMany(AskManyArgs),

    /// Summarize a repository's recent commit history.
    Story(StoryArgs),

    /// List the branches of a repository.
    Branches(BranchesArgs),

    /// Print version and build information.
    Version,
}

/// Which commits to analyze.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Branch to analyze (default: the repository's default branch).
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Number of most recent commits to fetch (pages through the history above 100).
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Skip per-commit file changes (one request per commit otherwise).
    #[arg(long, default_value_t = false)]
    pub no_files: bool,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Repository as `owner/name` or a github.com URL.
    #[arg(value_parser = parse_repo)]
    pub repo: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the `ask` subcommand.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer.
    pub question: String,

    /// Repository as `owner/name` or a github.com URL.
    #[arg(long, short = 'r', value_parser = parse_repo)]
    pub repo: String,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Model identifier (overrides config).
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

/// Arguments for the `ask-many` subcommand.
#[derive(Args, Debug)]
pub struct AskManyArgs {
    /// The question to answer.
    pub question: String,

    /// Repository as `owner/name` or a github.com URL; repeat for each one.
    #[arg(long = "repo", short = 'r', required = true, value_parser = parse_repo)]
    pub repos: Vec<String>,

    /// Most recent commits to take from each repository's default branch.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Skip per-commit file changes (one request per commit otherwise).
    #[arg(long, default_value_t = false)]
    pub no_files: bool,

    /// Model identifier (overrides config).
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

/// Arguments for the `story` subcommand.
#[derive(Args, Debug)]
pub struct StoryArgs {
    /// Repository as `owner/name` or a github.com URL.
    #[arg(long, short = 'r', value_parser = parse_repo)]
    pub repo: String,

    /// Tone of the summary.
    #[arg(long, default_value = "narrative")]
    pub style: StoryStyle,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Model identifier (overrides config).
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

/// Arguments for the `branches` subcommand.
#[derive(Args, Debug)]
pub struct BranchesArgs {
    /// Repository as `owner/name` or a github.com URL.
    #[arg(value_parser = parse_repo)]
    pub repo: String,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl OutputFormat {
    /// The renderer for this format.
    pub fn renderer(self) -> Box<dyn commet::output::OutputRenderer> {
        match self {
            OutputFormat::Terminal => Box::new(commet::output::terminal::TerminalRenderer),
            OutputFormat::Json => Box::new(commet::output::json::JsonRenderer),
        }
    }
}

fn parse_repo(input: &str) -> Result<String, String> {
    parse_repository(input).map_err(|e| e.to_string())
}
