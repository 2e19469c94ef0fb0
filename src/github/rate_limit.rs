//! The `/rate_limit` payload.

use crate::Result;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the resource that carries the GraphQL quota.
pub const GRAPHQL_RESOURCE: &str = "graphql";

/// Quota state of one API resource (`core`, `search`, `graphql`, ...) at the time of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub resource: String,
    pub limit: u64,
    pub remaining: u64,
    pub used: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    /// Share of the quota still available, in percent. Zero when the resource has no quota.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "quota values are far below 2^52")]
    pub fn remaining_percent(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            self.remaining as f64 * 100.0 / self.limit as f64
        }
    }

    /// Share of the quota consumed, in percent. Zero when the resource has no quota.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "quota values are far below 2^52")]
    pub fn used_percent(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            self.used as f64 * 100.0 / self.limit as f64
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: BTreeMap<String, RawQuota>,
}

#[derive(Debug, Deserialize)]
struct RawQuota {
    limit: u64,
    remaining: u64,
    /// Older GitHub Enterprise releases omit this field.
    #[serde(default)]
    used: Option<u64>,
    reset: i64,
}

/// Parse a `/rate_limit` response body into snapshots ordered by resource name.
pub fn parse_rate_limit(body: &[u8]) -> Result<Vec<RateLimitSnapshot>> {
    let response: RateLimitResponse = serde_json::from_slice(body).into_app_err("parsing rate limit response")?;

    if response.resources.is_empty() {
        bail!("rate limit response lists no resources");
    }

    response
        .resources
        .into_iter()
        .map(|(resource, quota)| {
            let reset_at = DateTime::from_timestamp(quota.reset, 0)
                .into_app_err_with(|| format!("invalid reset timestamp {} for resource '{resource}'", quota.reset))?;

            Ok(RateLimitSnapshot {
                used: quota.used.unwrap_or_else(|| quota.limit.saturating_sub(quota.remaining)),
                resource,
                limit: quota.limit,
                remaining: quota.remaining,
                reset_at,
            })
        })
        .collect()
}
