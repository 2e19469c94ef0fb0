use super::common::{self, Health};
use crate::Result;
use crate::collect::{AppResult, AppStatus};
use crate::config::AuthMethod;
use chrono::{DateTime, Utc};
use core::fmt::Write;
use owo_colors::OwoColorize;

const RULE: &str = "════════════════════════════════════════════════════════════════════════════════";

pub fn generate<W: Write>(results: &[AppResult], now: DateTime<Utc>, use_colors: bool, writer: &mut W) -> Result<()> {
    writeln!(writer, "{RULE}")?;
    let title = format!("GitHub API Rate Limit Status - {}", common::format_timestamp(now));
    if use_colors {
        writeln!(writer, "{}", title.bold())?;
    } else {
        writeln!(writer, "{title}")?;
    }
    writeln!(writer, "{RULE}")?;

    for result in results {
        writeln!(writer)?;

        let identity = &result.identity;
        let heading = match (identity.auth_method(), identity.app_id(), identity.installation_id()) {
            (AuthMethod::GitHubApp, Some(app_id), Some(installation_id)) => {
                format!("{} (github_app, app {app_id}, installation {installation_id})", identity.name())
            }
            (method, _, _) => format!("{} ({method})", identity.name()),
        };

        if use_colors {
            writeln!(writer, "{}", heading.bold())?;
        } else {
            writeln!(writer, "{heading}")?;
        }

        if let AppStatus::Error(failure) = &result.status {
            let label = format!("ERROR ({})", failure.kind);
            if use_colors {
                writeln!(writer, "  {} {}", label.red().bold(), failure.detail)?;
            } else {
                writeln!(writer, "  {label} {}", failure.detail)?;
            }
            continue;
        }

        for snapshot in &result.snapshots {
            let health = common::format_health(Health::of(snapshot));
            let colored_health = if use_colors {
                match Health::of(snapshot) {
                    Health::Healthy => health.green().bold().to_string(),
                    Health::Warning => health.yellow().bold().to_string(),
                    Health::Critical => health.red().bold().to_string(),
                }
            } else {
                health.to_string()
            };

            writeln!(writer, "  {:<28} {colored_health}", snapshot.resource.to_uppercase())?;
            writeln!(writer, "    Limit:     {:>8}", snapshot.limit)?;
            writeln!(writer, "    Used:      {:>8} ({:>5.1}%)", snapshot.used, snapshot.used_percent())?;
            writeln!(writer, "    Remaining: {:>8} ({:>5.1}%)", snapshot.remaining, snapshot.remaining_percent())?;
            writeln!(
                writer,
                "    Resets at: {} ({})",
                common::format_timestamp(snapshot.reset_at),
                common::format_countdown(snapshot.reset_at, now)
            )?;
        }
    }

    Ok(())
}
