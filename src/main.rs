//! commet: ask questions about a GitHub repository's recent commits.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commet::aggregate;
use commet::config::Config;
use commet::constants;
use commet::env::Env;
use commet::error::{AnalysisError, ErrorKind};
use commet::hosting::HostingProvider;
use commet::hosting::github::GitHubClient;
use commet::pipeline::{Analyzer, AnalyzerOptions};
use commet::providers::rig::RigBackend;
use commet::session::QaSession;

use cli::args::{Cli, Command, OutputFormat, TargetArgs};

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        if let Some(hint) = hint(&err) {
            eprintln!("  {hint}");
        }
        process::exit(1);
    }
}

/// Log to stderr, filtered by `COMMET_LOG` (default: warnings only).
fn init_logging() {
    let filter = EnvFilter::try_from_env(constants::ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let renderer = cli.format.renderer();
    let verbose = !cli.quiet && cli.format == OutputFormat::Terminal;

    match cli.command {
        Command::Analyze(args) => {
            let config = load_config(cli.token)?;
            let analyzer = build_analyzer(&config, &args.target, false)?;
            if verbose {
                cli::print_status(&format!("Fetching {}", args.repo));
            }
            let snapshot = analyzer
                .request_analysis(&args.repo, args.target.branch.as_deref(), args.target.limit)
                .await?;
            let stats = aggregate::stats(&snapshot);
            print!("{}", renderer.render_analysis(&snapshot, &stats));
        }
        Command::Ask(args) => {
            let config = load_config(cli.token)?;
            let analyzer = build_analyzer(&config, &args.target, true)?;
            let model = args.model.unwrap_or_else(|| config.provider.model.clone());
            if verbose {
                cli::print_status(&format!("Analyzing {} with {model}", args.repo));
            }
            let exchange = analyzer
                .request_chat(
                    &args.question,
                    &args.repo,
                    args.target.branch.as_deref(),
                    args.target.limit,
                    &model,
                )
                .await?;
            print!("{}", renderer.render_exchange(&exchange));
        }
        Command::AskMany(args) => {
            let config = load_config(cli.token)?;
            let target = TargetArgs {
                branch: None,
                limit: args.limit,
                no_files: args.no_files,
            };
            let analyzer = build_analyzer(&config, &target, true)?;
            let model = args.model.unwrap_or_else(|| config.provider.model.clone());
            if verbose {
                cli::print_status(&format!(
                    "Analyzing {} repositories with {model}",
                    args.repos.len()
                ));
            }
            let exchange = analyzer
                .request_multi_chat(&args.question, &args.repos, args.limit, &model)
                .await?;
            print!("{}", renderer.render_multi_exchange(&exchange));
        }
        Command::Story(args) => {
            let config = load_config(cli.token)?;
            let analyzer = build_analyzer(&config, &args.target, true)?;
            let model = args.model.unwrap_or_else(|| config.provider.model.clone());
            if verbose {
                cli::print_status(&format!("Writing a {} story for {}", args.style, args.repo));
            }
            let story = analyzer
                .request_story(
                    &args.repo,
                    args.target.branch.as_deref(),
                    args.target.limit,
                    args.style,
                    &model,
                )
                .await?;
            print!("{}", renderer.render_story(&story));
        }
        Command::Branches(args) => {
            let config = load_config(cli.token)?;
            let target = TargetArgs {
                branch: None,
                limit: None,
                no_files: true,
            };
            let analyzer = build_analyzer(&config, &target, false)?;
            let branches = analyzer.list_branches(&args.repo).await?;
            print!("{}", renderer.render_branches(&args.repo, &branches));
        }
        Command::Version => run_version()?,
    }

    Ok(())
}

/// Layered config from the working directory and environment, with a
/// `--token` override on top.
fn load_config(token: Option<String>) -> Result<Config> {
    let cwd = std::env::current_dir().ok();
    let mut config =
        Config::load(cwd.as_deref(), &Env::real()).context("failed to load configuration")?;
    if token.is_some() {
        config.hosting.token = token;
    }
    Ok(config)
}

/// Wire the GitHub client and, for model-backed commands, the answer backend.
fn build_analyzer(config: &Config, target: &TargetArgs, with_session: bool) -> Result<Analyzer> {
    let hosting: Arc<dyn HostingProvider> = Arc::new(GitHubClient::new(&config.hosting)?);
    let options = AnalyzerOptions {
        max_concurrent_fetches: config.hosting.max_concurrent_fetches,
        default_limit: config.context.default_commits,
        with_file_changes: !target.no_files,
    };
    let mut analyzer = Analyzer::new(hosting, options);

    if with_session {
        let backend = RigBackend::new(config.provider.clone())?;
        analyzer = analyzer.with_session(QaSession::new(
            Arc::new(backend),
            config.context.options(),
        ));
    }

    Ok(analyzer)
}

/// A follow-up suggestion for errors the user can act on.
fn hint(err: &anyhow::Error) -> Option<String> {
    let err = err.downcast_ref::<AnalysisError>()?;
    match err.kind() {
        ErrorKind::Unauthorized => Some(format!(
            "Set {} (or {}) or pass --token.",
            constants::ENV_GITHUB_TOKEN,
            constants::ENV_GITHUB_TOKEN_FALLBACK
        )),
        ErrorKind::RateLimited => Some(match err.retry_after() {
            Some(delay) => format!(
                "GitHub rate limit reached. Retry in {}s or authenticate with --token.",
                delay.as_secs()
            ),
            None => "GitHub rate limit reached. Retry later or authenticate with --token."
                .to_string(),
        }),
        ErrorKind::Transport => Some("The request may succeed if retried.".to_string()),
        _ => None,
    }
}

/// Print detailed version and build information.
fn run_version() -> Result<()> {
    use colored::Colorize;

    println!("{} {}", constants::APP_NAME.bold(), constants::VERSION.green().bold());
    println!("{}     {}", "target:".dimmed(), constants::TARGET);
    Ok(())
}
