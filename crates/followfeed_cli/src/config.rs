//! Configuration file support for followfeed.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `FOLLOWFEED_`, sections separated
//!    by `__`, e.g., `FOLLOWFEED_COLLECT__DAYS`)
//! 3. Local config file (./followfeed.toml)
//! 4. XDG config file (~/.config/followfeed/config.toml)
//! 5. Built-in defaults
//!
//! The GitHub token is read from `GITHUB_TOKEN` first and falls back to
//! `github.token`.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use GITHUB_TOKEN
//! api_url = "https://api.github.com"
//!
//! [collect]
//! days = 30
//! page_limit = 10
//! concurrency = 1
//! requests_per_second = 0  # 0 disables proactive pacing
//!
//! [output]
//! path = "events.json"
//!
//! [http]
//! timeout_secs = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use followfeed::collect::{
    CollectOptions, DAYS_AGO, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MAX_DAYS, PAGE_LIMIT,
};
use followfeed::github::GITHUB_API_URL;
use followfeed::rate_limit::ApiRateLimiter;
use followfeed::snapshot::DEFAULT_OUTPUT_PATH;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the GitHub credential.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Errors raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GITHUB_TOKEN is not set")]
    MissingToken,

    #[error("collect.{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

/// Reject `value` outside `min..=max`.
fn check_range<T>(key: &'static str, value: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: Copy + PartialOrd + std::fmt::Display,
{
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Collection options.
    pub collect: CollectConfig,
    /// Snapshot output.
    pub output: OutputConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. `GITHUB_TOKEN` takes precedence.
    pub token: Option<String>,
    /// REST API base URL, for GitHub Enterprise.
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: GITHUB_API_URL.to_string(),
        }
    }
}

/// Collection options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Keep events newer than this many days.
    pub days: i64,
    /// Event page cap per account.
    pub page_limit: u32,
    /// Accounts fetched concurrently.
    pub concurrency: usize,
    /// Proactive request pacing. 0 disables it.
    pub requests_per_second: u32,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            days: DAYS_AGO,
            page_limit: PAGE_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: 0,
        }
    }
}

/// Snapshot output.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub days: Option<i64>,
    pub page_limit: Option<u32>,
    pub concurrency: Option<usize>,
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/followfeed/config.toml)
    /// 3. Local config file (./followfeed.toml)
    /// 4. Environment variables with FOLLOWFEED_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("followfeed.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./followfeed.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., FOLLOWFEED_COLLECT__PAGE_LIMIT -> collect.page_limit
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("FOLLOWFEED")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.output {
            self.output.path = path;
        }
        if let Some(days) = overrides.days {
            self.collect.days = days;
        }
        if let Some(page_limit) = overrides.page_limit {
            self.collect.page_limit = page_limit;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.collect.concurrency = concurrency;
        }
        if let Some(api_url) = overrides.api_url {
            self.github.api_url = api_url;
        }
        self
    }

    /// Get the GitHub token, preferring `GITHUB_TOKEN`.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        self.resolve_token(std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve_token(&self, from_env: Option<String>) -> Result<String, ConfigError> {
        from_env
            .into_iter()
            .chain(self.github.token.clone())
            .find(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    /// Options passed to the collection engine, checked against their bounds.
    pub fn collect_options(&self) -> Result<CollectOptions, ConfigError> {
        let days = check_range("days", self.collect.days, 1, MAX_DAYS)?;
        let page_limit = check_range("page_limit", self.collect.page_limit, 1, u32::MAX)?;
        let concurrency = check_range("concurrency", self.collect.concurrency, 1, MAX_CONCURRENCY)?;

        Ok(CollectOptions {
            days,
            page_limit,
            concurrency,
        })
    }

    /// Proactive limiter, if pacing is enabled.
    pub fn rate_limiter(&self) -> Option<ApiRateLimiter> {
        match self.collect.requests_per_second {
            0 => None,
            rps => Some(ApiRateLimiter::new(rps)),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "followfeed").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
