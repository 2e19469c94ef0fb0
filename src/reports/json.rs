use crate::Result;
use crate::collect::{AppResult, AppStatus};
use chrono::{DateTime, Utc};
use core::fmt::Write;
use serde_json::json;

pub fn generate<W: Write>(results: &[AppResult], now: DateTime<Utc>, writer: &mut W) -> Result<()> {
    let apps: Vec<_> = results
        .iter()
        .map(|result| {
            let identity = &result.identity;
            let mut app = json!({
                "name": identity.name(),
                "auth": identity.auth_method().to_string(),
                "app_id": identity.app_id(),
                "installation_id": identity.installation_id(),
                "observed_at": result.observed_at.to_rfc3339(),
            });

            match &result.status {
                AppStatus::Ok => {
                    app["status"] = json!("ok");
                    app["resources"] = json!(result.snapshots);
                    if let Some(graphql) = result.graphql() {
                        app["graphql"] = json!(graphql);
                    }
                }
                AppStatus::Error(failure) => {
                    app["status"] = json!("error");
                    app["error"] = json!({
                        "kind": failure.kind.as_str(),
                        "detail": failure.detail,
                    });
                }
            }

            app
        })
        .collect();

    let output = json!({
        "timestamp": now.to_rfc3339(),
        "apps": apps,
    });

    writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}
