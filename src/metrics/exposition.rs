//! Prometheus text exposition format.
//!
//! Renders a [`MetricsSnapshot`] in text format 0.0.4 for scraping by a Prometheus server or any
//! compatible agent.

use super::{AppLabels, MetricsSnapshot, ResourceGauges};
use core::fmt::Write;

/// Content type of the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

type Field = fn(&ResourceGauges) -> i128;

const RESOURCE_GAUGES: [(&str, &str, Field); 4] = [
    ("github_rate_limit_limit", "Maximum number of requests allowed in the current window.", limit),
    ("github_rate_limit_remaining", "Requests remaining in the current window.", remaining),
    ("github_rate_limit_used", "Requests used in the current window.", used),
    ("github_rate_limit_reset", "Unix time at which the current window resets.", reset),
];

const GRAPHQL_GAUGES: [(&str, &str, Field); 3] = [
    ("github_graphql_rate_limit_limit", "Maximum GraphQL points allowed in the current window.", limit),
    ("github_graphql_rate_limit_remaining", "GraphQL points remaining in the current window.", remaining),
    ("github_graphql_rate_limit_used", "GraphQL points used in the current window.", used),
];

fn limit(g: &ResourceGauges) -> i128 {
    i128::from(g.limit)
}

fn remaining(g: &ResourceGauges) -> i128 {
    i128::from(g.remaining)
}

fn used(g: &ResourceGauges) -> i128 {
    i128::from(g.used)
}

fn reset(g: &ResourceGauges) -> i128 {
    i128::from(g.reset)
}

/// Render every series of `snapshot`.
#[must_use]
pub fn render(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    header(&mut out, "github_app_status", "Whether the last collection for the app succeeded (1) or failed (0).");
    for series in snapshot.apps() {
        let _ = writeln!(out, "github_app_status{{{}}} {}", labels(&series.labels, None), u8::from(series.up));
    }

    for (name, help, field) in RESOURCE_GAUGES {
        header(&mut out, name, help);
        for series in snapshot.apps() {
            for (resource, gauges) in &series.resources {
                let _ = writeln!(out, "{name}{{{}}} {}", labels(&series.labels, Some(resource.as_str())), field(gauges));
            }
        }
    }

    for (name, help, field) in GRAPHQL_GAUGES {
        header(&mut out, name, help);
        for series in snapshot.apps() {
            if let Some(gauges) = snapshot.graphql(&series.labels.app_name) {
                let _ = writeln!(out, "{name}{{{}}} {}", labels(&series.labels, None), field(&gauges));
            }
        }
    }

    out
}

fn header(out: &mut String, name: &str, help: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
}

fn labels(app: &AppLabels, resource: Option<&str>) -> String {
    let mut s = format!(
        "app_name=\"{}\",app_id=\"{}\",installation_id=\"{}\"",
        escape(&app.app_name),
        escape(&app.app_id),
        escape(&app.installation_id)
    );

    if let Some(resource) = resource {
        let _ = write!(s, ",resource=\"{}\"", escape(resource));
    }

    s
}

/// Escape a label value: backslash, double quote, and line feed.
fn escape(value: &str) -> String {
    let mut s = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => s.push_str("\\\\"),
            '"' => s.push_str("\\\""),
            '\n' => s.push_str("\\n"),
            c => s.push(c),
        }
    }
    s
}
