//! Command dispatch logic for gh-rate-monitor

use super::{CheckArgs, InitArgs, ValidateArgs, WatchArgs, check, init_config, validate_config, watch};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "gh-rate-monitor", version, author, long_about = None)]
#[command(about = "Watch GitHub API rate limits for personal tokens and GitHub App installations")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: MonitorSubcommand,
}

#[derive(Subcommand, Debug)]
enum MonitorSubcommand {
    /// Check every configured app once and print a report
    Check(Box<CheckArgs>),
    /// Check periodically, optionally exporting Prometheus metrics
    Watch(Box<WatchArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        MonitorSubcommand::Check(check_args) => check(host, check_args).await,
        MonitorSubcommand::Watch(watch_args) => watch(host, watch_args).await,
        MonitorSubcommand::Init(init_args) => init_config(host, init_args),
        MonitorSubcommand::Validate(validate_args) => validate_config(host, validate_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_options() {
        let cli = Cli::try_parse_from(["gh-rate-monitor", "watch", "--interval", "30", "--listen", "127.0.0.1:9090", "-q"]).unwrap();
        let MonitorSubcommand::Watch(args) = cli.command else {
            panic!("expected the watch subcommand");
        };
        assert_eq!(args.interval, Some(30));
        assert_eq!(args.listen.unwrap().port(), 9090);
        assert!(args.quiet);
    }

    #[test]
    fn test_parse_credential_flags() {
        let cli = Cli::try_parse_from([
            "gh-rate-monitor",
            "check",
            "--app-id",
            "42",
            "--installation-id",
            "7",
            "--private-key",
            "keys/app.pem",
        ])
        .unwrap();
        let MonitorSubcommand::Check(args) = cli.command else {
            panic!("expected the check subcommand");
        };

        let overrides = args.common.credential_overrides();
        assert_eq!(overrides.app_id, Some(42));
        assert_eq!(overrides.installation_id, Some(7));
        assert_eq!(overrides.private_key_path.as_deref().map(camino::Utf8Path::as_str), Some("keys/app.pem"));
        assert!(overrides.token.is_none());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let _ = Cli::try_parse_from(["gh-rate-monitor", "watch", "--interval", "0"]).unwrap_err();
    }
}
