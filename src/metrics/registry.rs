use crate::collect::AppResult;
use crate::config::AppIdentity;
use crate::github::{GRAPHQL_RESOURCE, RateLimitSnapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

const LOG_TARGET: &str = "   metrics";

/// Labels that identify an app's series.
///
/// Personal-token identities have no app or installation id and carry empty strings instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppLabels {
    pub app_name: Arc<str>,
    pub app_id: String,
    pub installation_id: String,
}

impl AppLabels {
    #[must_use]
    pub fn of(identity: &AppIdentity) -> Self {
        Self {
            app_name: Arc::clone(identity.name_arc()),
            app_id: identity.app_id().map(|id| id.to_string()).unwrap_or_default(),
            installation_id: identity.installation_id().map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

/// Gauge values of one rate-limited resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceGauges {
    pub limit: u64,
    pub remaining: u64,
    pub used: u64,

    /// Unix timestamp at which the quota window resets.
    pub reset: i64,
}

impl From<&RateLimitSnapshot> for ResourceGauges {
    fn from(snapshot: &RateLimitSnapshot) -> Self {
        Self {
            limit: snapshot.limit,
            remaining: snapshot.remaining,
            used: snapshot.used,
            reset: snapshot.reset_at.timestamp(),
        }
    }
}

/// Every exported series of one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSeries {
    pub labels: AppLabels,

    /// Whether the last cycle observed this app successfully.
    pub up: bool,

    /// Values from the last successful observation, keyed by resource name.
    pub resources: BTreeMap<String, ResourceGauges>,
}

/// An immutable view of all series, as published after a complete cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    apps: BTreeMap<Arc<str>, AppSeries>,
    cycles: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    /// All apps ever observed during this process's lifetime, ordered by name.
    pub fn apps(&self) -> impl Iterator<Item = &AppSeries> {
        self.apps.values()
    }

    #[must_use]
    pub fn app(&self, name: &str) -> Option<&AppSeries> {
        self.apps.get(name)
    }

    #[must_use]
    pub fn app_status(&self, name: &str) -> Option<bool> {
        self.app(name).map(|series| series.up)
    }

    #[must_use]
    pub fn resource(&self, name: &str, resource: &str) -> Option<ResourceGauges> {
        self.app(name)?.resources.get(resource).copied()
    }

    /// The GraphQL quota of an app, taken from its `graphql` resource.
    #[must_use]
    pub fn graphql(&self, name: &str) -> Option<ResourceGauges> {
        self.resource(name, GRAPHQL_RESOURCE)
    }

    /// Number of cycles applied so far.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn apply(&mut self, results: &[AppResult]) {
        for result in results {
            let labels = AppLabels::of(&result.identity);
            let series = self
                .apps
                .entry(Arc::clone(&labels.app_name))
                .or_insert_with(|| AppSeries {
                    labels: labels.clone(),
                    up: false,
                    resources: BTreeMap::new(),
                });

            series.labels = labels;
            series.up = result.is_ok();

            // A failed observation leaves the last known quota values in place.
            if result.is_ok() {
                series.resources = result
                    .snapshots
                    .iter()
                    .map(|snapshot| (snapshot.resource.clone(), ResourceGauges::from(snapshot)))
                    .collect();
            }

            self.updated_at = Some(self.updated_at.map_or(result.observed_at, |t| t.max(result.observed_at)));
        }

        self.cycles += 1;
    }
}

/// Holds the current [`MetricsSnapshot`] and replaces it atomically after each cycle.
///
/// Readers grab an `Arc` to the published snapshot and never see a partially applied cycle.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    current: RwLock<Arc<MetricsSnapshot>>,
    update: Mutex<()>,
}

impl MetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle's results into a new snapshot and publish it.
    ///
    /// Apps absent from `results` keep their series untouched.
    pub fn update(&self, results: &[AppResult]) {
        let _update = self.update.lock().expect("lock not poisoned");

        let mut next = MetricsSnapshot::clone(&self.snapshot());
        next.apply(results);

        log::debug!(
            target: LOG_TARGET,
            "Publishing metrics for cycle {} ({} app(s), {} up)",
            next.cycles,
            next.apps.len(),
            next.apps.values().filter(|series| series.up).count()
        );

        *self.current.write().expect("lock not poisoned") = Arc::new(next);
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<MetricsSnapshot> {
        Arc::clone(&self.current.read().expect("lock not poisoned"))
    }

    /// The most recently published snapshot in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        super::exposition::render(&self.snapshot())
    }
}
