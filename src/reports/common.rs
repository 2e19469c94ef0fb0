use crate::github::RateLimitSnapshot;
use chrono::{DateTime, Utc};

/// How close a resource is to exhausting its quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// More than half of the quota remains
    Healthy,

    /// More than a fifth of the quota remains
    Warning,

    Critical,
}

impl Health {
    #[must_use]
    pub fn of(snapshot: &RateLimitSnapshot) -> Self {
        let remaining = snapshot.remaining_percent();
        if remaining > 50.0 {
            Self::Healthy
        } else if remaining > 20.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

pub const fn format_health(health: Health) -> &'static str {
    match health {
        Health::Healthy => "HEALTHY",
        Health::Warning => "WARNING",
        Health::Critical => "CRITICAL",
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Time until `reset_at`, e.g. `in 12m 5s`. A reset in the past reads `now`.
pub fn format_countdown(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (reset_at - now).num_seconds();
    if secs <= 0 {
        return "now".to_string();
    }

    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("in {hours}h {minutes}m {seconds}s")
    } else {
        format!("in {minutes}m {seconds}s")
    }
}
