//! Common processing logic shared between the check and watch commands.

use super::Host;
use crate::Result;
use crate::auth::{CredentialResolver, SecretToken, TokenStore};
use crate::collect::{AppResult, Collector};
use crate::config::{Config, CredentialOverrides};
use crate::github::Client;
use crate::metrics::MetricsRegistry;
use crate::reports::{generate_console, generate_json};
use crate::scheduler::Scheduler;
use camino::Utf8PathBuf;
use chrono::{TimeDelta, Utc};
use clap::{Args, ValueEnum};
use ohno::IntoAppError;
use std::io::Write;
use std::sync::Arc;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Common arguments shared between the check and watch commands
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to configuration file (default is `gh-rate-monitor.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,

    /// Print reports as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// GitHub personal access token (or use the GITHUB_TOKEN env var)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// GitHub App ID (or use the GITHUB_APP_ID env var)
    #[arg(long, value_name = "ID")]
    pub app_id: Option<u64>,

    /// GitHub App installation ID (or use the GITHUB_APP_INSTALLATION_ID env var)
    #[arg(long, value_name = "ID")]
    pub installation_id: Option<u64>,

    /// Path to the GitHub App private key (or use the GITHUB_APP_PRIVATE_KEY_PATH env var)
    #[arg(long, value_name = "PATH")]
    pub private_key: Option<Utf8PathBuf>,
}

impl CommonArgs {
    /// Credentials given on the command line, used when the configuration lists no apps
    #[must_use]
    pub fn credential_overrides(&self) -> CredentialOverrides {
        CredentialOverrides {
            token: self.token.clone().map(SecretToken::from),
            app_id: self.app_id,
            installation_id: self.installation_id,
            private_key_path: self.private_key.clone(),
        }
    }
}

/// Everything a command needs to run collection cycles.
#[derive(Debug)]
pub struct Common {
    pub config: Config,
    pub scheduler: Scheduler,
    use_colors: bool,
    json: bool,
}

impl Common {
    /// Set up logging, load the configuration, and wire the collection pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no identity can be built from it
    pub fn new(args: &CommonArgs) -> Result<Self> {
        init_logging(args.log_level);

        let config = Config::load(args.config.as_deref())?.with_credential_overrides(args.credential_overrides());

        let use_colors = match args.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                use std::io::{IsTerminal, stdout};
                stdout().is_terminal()
            }
        };

        Self::from_config(config, use_colors, args.json)
    }

    /// Wire the collection pipeline for an already loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no identity can be built from the configuration
    pub fn from_config(config: Config, use_colors: bool, json: bool) -> Result<Self> {
        let scheduler = build_scheduler(&config)?;
        Ok(Self {
            config,
            scheduler,
            use_colors,
            json,
        })
    }

    /// Write the report of one cycle to the host's output
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be rendered
    pub fn report<H: Host>(&self, host: &mut H, results: &[AppResult]) -> Result<()> {
        let mut output = String::new();
        if self.json {
            generate_json(results, Utc::now(), &mut output)?;
        } else {
            generate_console(results, Utc::now(), self.use_colors, &mut output)?;
        }

        let _ = write!(host.output(), "{output}");
        Ok(())
    }
}

/// Build the scheduler for the identities and settings in `config`
///
/// # Errors
///
/// Returns an error if any identity is invalid or the HTTP client cannot be created
pub fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let identities = config.identities()?;
    let client = Client::new(&config.api_url, config.request_timeout)?;

    let refresh_buffer = TimeDelta::from_std(config.refresh_buffer).into_app_err("refresh_buffer is out of range")?;
    let tokens = Arc::new(TokenStore::new(CredentialResolver::new(client.clone()), refresh_buffer));

    let collector = Collector::new(client, tokens)
        .with_max_concurrency(config.max_concurrency)
        .with_app_timeout(config.app_timeout)
        .with_cycle_timeout(Some(config.cycle_timeout));

    Ok(Scheduler::new(collector, Arc::new(MetricsRegistry::new()), identities))
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A logger may already be installed when commands run more than once in a process.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
