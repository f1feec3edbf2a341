//! Followfeed CLI - snapshot the recent activity of the accounts you follow.

mod config;
mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use console::Term;
use followfeed::collect::{CollectOptions, MAX_CONCURRENCY, MAX_DAYS, collect_snapshot};
use followfeed::github::GitHubClient;
use followfeed::http::ReqwestTransport;
use followfeed::rate_limit::RateLimitGate;
use followfeed::snapshot::write_snapshot;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};
use crate::progress::ProgressReporter;

const USAGE: &str = "Usage: GITHUB_TOKEN=your_token followfeed [OPTIONS]";

#[derive(Parser)]
#[command(name = "followfeed")]
#[command(version)]
#[command(about = "Snapshot recent GitHub activity of the accounts you follow")]
#[command(
    long_about = "Followfeed walks the list of accounts the authenticated user follows, \
fetches each account's recent public events, and writes the unique \
(repository, event type) pairs per account to a JSON file."
)]
#[command(after_long_help = r#"EXAMPLES
    Collect the last 30 days into ./events.json:
        $ GITHUB_TOKEN=ghp_... followfeed

    Collect the last week into a custom file:
        $ followfeed --days 7 --output week.json

CONFIGURATION
    Followfeed reads configuration from:
      1. ~/.config/followfeed/config.toml (or $XDG_CONFIG_HOME/followfeed/config.toml)
      2. ./followfeed.toml
      3. Environment variables (FOLLOWFEED_* prefix, e.g., FOLLOWFEED_COLLECT__DAYS)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITHUB_TOKEN                  GitHub personal access token (required)
    FOLLOWFEED_GITHUB__API_URL    REST API base URL (default: https://api.github.com)
    FOLLOWFEED_OUTPUT__PATH       Output file (default: events.json)
"#)]
struct Cli {
    /// Output file (default from config or events.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only keep events from the last N days (default from config or 30)
    #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..=MAX_DAYS))]
    days: Option<i64>,

    /// Maximum event pages per account (default from config or 10)
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u32).range(1..))]
    page_limit: Option<u32>,

    /// Accounts fetched at once, up to 64 (default from config or 1)
    #[arg(short, long, value_parser = parse_concurrency)]
    concurrency: Option<usize>,

    /// GitHub REST API base URL (default from config or https://api.github.com)
    #[arg(long)]
    api_url: Option<String>,
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    let concurrency: usize = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if (1..=MAX_CONCURRENCY).contains(&concurrency) {
        Ok(concurrency)
    } else {
        Err(format!("{concurrency} is not in 1..={MAX_CONCURRENCY}"))
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            output: self.output.clone(),
            days: self.days,
            page_limit: self.page_limit,
            concurrency: self.concurrency,
            api_url: self.api_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing for non-TTY mode (structured logging)
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("followfeed=info,followfeed_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = Config::load().with_overrides(cli.overrides());

    let token = match config.github_token() {
        Ok(token) => token,
        Err(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    let options = match config.collect_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config, &options, &token).await {
        tracing::error!(error = %e, "Collection failed");
        return Err(e);
    }

    Ok(())
}

async fn run(
    config: &Config,
    options: &CollectOptions,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = ReqwestTransport::with_timeout(config.http_timeout())?;

    let mut gate = RateLimitGate::new();
    if let Some(limiter) = config.rate_limiter() {
        gate = gate.with_pacing(limiter);
    }

    let client = GitHubClient::new(token, Arc::new(transport))
        .with_api_url(&config.github.api_url)
        .with_rate_limit_gate(gate);

    tracing::debug!(
        days = options.days,
        page_limit = options.page_limit,
        concurrency = options.concurrency,
        api_url = %client.api_url(),
        "Starting collection"
    );

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let result = collect_snapshot(&client, options, Some(&*callback)).await;
    reporter.finish();
    let result = result?;

    write_snapshot(&config.output.path, &result.snapshot)?;

    tracing::info!(
        path = %config.output.path.display(),
        accounts = result.stats.accounts,
        pages = result.stats.pages_fetched,
        events = result.stats.events_kept,
        rate_limit_waits = result.stats.rate_limit_waits,
        "Wrote snapshot"
    );

    Ok(())
}
