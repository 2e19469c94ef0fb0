use crate::config::AppIdentity;
use crate::github::{FetchError, GRAPHQL_RESOURCE, RateLimitSnapshot};
use chrono::{DateTime, Utc};
use core::fmt;

/// Why an app could not be observed in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    Network,
    MalformedResponse,
    Timeout,

    /// The collection task itself failed (panicked or was cancelled).
    Internal,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::MalformedResponse => "malformed_response",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FetchError> for FailureKind {
    fn from(e: &FetchError) -> Self {
        match e {
            FetchError::Authentication(_) => Self::Authentication,
            FetchError::Network(_) => Self::Network,
            FetchError::MalformedResponse(_) => Self::MalformedResponse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFailure {
    pub kind: FailureKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    Ok,
    Error(AppFailure),
}

/// Outcome of observing one identity in one collection cycle.
#[derive(Debug, Clone)]
pub struct AppResult {
    pub identity: AppIdentity,

    /// Ordered by resource name. Empty when `status` is an error.
    pub snapshots: Vec<RateLimitSnapshot>,

    pub status: AppStatus,

    /// Timestamp of the cycle that produced this result.
    pub observed_at: DateTime<Utc>,
}

impl AppResult {
    #[must_use]
    pub const fn ok(identity: AppIdentity, snapshots: Vec<RateLimitSnapshot>, observed_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            snapshots,
            status: AppStatus::Ok,
            observed_at,
        }
    }

    #[must_use]
    pub fn failed(identity: AppIdentity, kind: FailureKind, detail: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            snapshots: Vec::new(),
            status: AppStatus::Error(AppFailure {
                kind,
                detail: detail.into(),
            }),
            observed_at,
        }
    }

    #[must_use]
    pub fn from_fetch_error(identity: AppIdentity, error: &FetchError, observed_at: DateTime<Utc>) -> Self {
        Self::failed(identity, error.into(), format!("{error}"), observed_at)
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, AppStatus::Ok)
    }

    /// Present iff the status is an error.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        match &self.status {
            AppStatus::Ok => None,
            AppStatus::Error(failure) => Some(&failure.detail),
        }
    }

    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            AppStatus::Ok => None,
            AppStatus::Error(failure) => Some(failure.kind),
        }
    }

    #[must_use]
    pub fn snapshot(&self, resource: &str) -> Option<&RateLimitSnapshot> {
        self.snapshots.iter().find(|s| s.resource == resource)
    }

    #[must_use]
    pub fn graphql(&self) -> Option<&RateLimitSnapshot> {
        self.snapshot(GRAPHQL_RESOURCE)
    }
}
