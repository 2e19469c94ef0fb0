use super::Host;
use crate::Result;
use crate::config::{AppIdentity, Config};
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file (default is `gh-rate-monitor.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

/// Load a configuration and build every identity it describes, without contacting GitHub
fn validate_config_inner(config_path: Option<&Utf8PathBuf>) -> Result<Vec<AppIdentity>> {
    let config = Config::load(config_path.map(Utf8PathBuf::as_path))?;
    config.identities()
}

pub fn validate_config<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    let config_path = args.config.as_ref();

    match validate_config_inner(config_path) {
        Ok(identities) => {
            let _ = writeln!(host.output(), "Configuration file is valid");
            if let Some(path) = config_path {
                let _ = writeln!(host.output(), "Config file: {path}");
            }

            for identity in &identities {
                match (identity.app_id(), identity.installation_id()) {
                    (Some(app_id), Some(installation_id)) => {
                        let _ = writeln!(
                            host.output(),
                            "  {}: {} (app {app_id}, installation {installation_id})",
                            identity.name(),
                            identity.auth_method()
                        );
                    }
                    _ => {
                        let _ = writeln!(host.output(), "  {}: {}", identity.name(), identity.auth_method());
                    }
                }
            }

            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "❌ Configuration validation failed: {e}");
            host.exit(1);
            Err(e)
        }
    }
}
