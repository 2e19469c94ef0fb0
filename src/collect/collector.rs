use super::{AppResult, FailureKind};
use crate::auth::TokenStore;
use crate::config::AppIdentity;
use crate::github::{Client, FetchError, RateLimitSnapshot};
use chrono::{DateTime, Utc};
use core::time::Duration;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, timeout_at};

const LOG_TARGET: &str = "   collect";

/// Default cap on the number of apps queried at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Default bound on the work for one app (token exchange plus rate-limit query).
pub const DEFAULT_APP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a whole collection cycle.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Observes every configured identity once per call, concurrently and in isolation.
///
/// Each identity gets its own spawned task with its own deadline, so a hung or failing app only ever
/// affects its own [`AppResult`].
#[derive(Debug, Clone)]
pub struct Collector {
    client: Client,
    tokens: Arc<TokenStore>,
    max_concurrency: usize,
    app_timeout: Duration,
    cycle_timeout: Option<Duration>,
}

impl Collector {
    #[must_use]
    pub fn new(client: Client, tokens: Arc<TokenStore>) -> Self {
        Self {
            client,
            tokens,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            app_timeout: DEFAULT_APP_TIMEOUT,
            cycle_timeout: Some(DEFAULT_CYCLE_TIMEOUT),
        }
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub const fn with_app_timeout(mut self, app_timeout: Duration) -> Self {
        self.app_timeout = app_timeout;
        self
    }

    /// Bound the whole cycle; `None` leaves only the per-app timeout.
    #[must_use]
    pub const fn with_cycle_timeout(mut self, cycle_timeout: Option<Duration>) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    #[must_use]
    pub const fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Observe all `identities`, returning exactly one result per identity in the same order.
    ///
    /// `observed_at` stamps every result of the cycle. Credentials are checked against the clock at
    /// the moment each app leaves the queue.
    ///
    /// Never fails as a whole: every error, timeout, or task failure is recorded in the result of the
    /// identity it belongs to.
    pub async fn collect(&self, identities: &[AppIdentity], observed_at: DateTime<Utc>) -> Vec<AppResult> {
        if identities.is_empty() {
            return Vec::new();
        }

        let num_workers = identities.len().min(self.max_concurrency).max(1);
        let semaphore = Arc::new(Semaphore::new(num_workers));
        let cycle_deadline = self.cycle_timeout.map(|t| Instant::now() + t);

        log::debug!(
            target: LOG_TARGET,
            "Collecting rate limits for {} app(s) with {num_workers} worker(s)",
            identities.len()
        );

        let tasks = identities.iter().map(|identity| {
            let task = AppTask {
                client: self.client.clone(),
                tokens: Arc::clone(&self.tokens),
                identity: identity.clone(),
                app_timeout: self.app_timeout,
                cycle_deadline,
                observed_at,
            };
            tokio::spawn(task.run(Arc::clone(&semaphore)))
        });

        let outcomes = join_all(tasks).await;

        identities
            .iter()
            .zip(outcomes)
            .map(|(identity, outcome)| {
                outcome.unwrap_or_else(|e| {
                    log::error!(target: LOG_TARGET, "Collection task for '{}' failed: {e}", identity.name());
                    AppResult::failed(identity.clone(), FailureKind::Internal, format!("collection task failed: {e}"), observed_at)
                })
            })
            .collect()
    }
}

/// Everything one spawned collection task owns.
struct AppTask {
    client: Client,
    tokens: Arc<TokenStore>,
    identity: AppIdentity,
    app_timeout: Duration,
    cycle_deadline: Option<Instant>,
    observed_at: DateTime<Utc>,
}

impl AppTask {
    async fn run(self, semaphore: Arc<Semaphore>) -> AppResult {
        let Some(_permit) = self.acquire(semaphore).await else {
            log::warn!(target: LOG_TARGET, "Cycle deadline passed before '{}' could be queried", self.identity.name());
            return AppResult::failed(
                self.identity,
                FailureKind::Timeout,
                "collection cycle deadline passed before the app could be queried",
                self.observed_at,
            );
        };

        let app_deadline = Instant::now() + self.app_timeout;
        let (deadline, cycle_bound) = match self.cycle_deadline {
            Some(cycle_deadline) if cycle_deadline < app_deadline => (cycle_deadline, true),
            _ => (app_deadline, false),
        };

        // Tokens are checked against the clock at dequeue time, not the cycle start.
        let outcome = timeout_at(deadline, self.observe(Utc::now())).await;
        match outcome {
            Ok(Ok(snapshots)) => {
                log::debug!(
                    target: LOG_TARGET,
                    "Collected {} resource(s) for '{}'",
                    snapshots.len(),
                    self.identity.name()
                );
                AppResult::ok(self.identity, snapshots, self.observed_at)
            }

            Ok(Err(e)) => {
                log::warn!(target: LOG_TARGET, "Could not collect rate limits for '{}': {e}", self.identity.name());
                AppResult::from_fetch_error(self.identity, &e, self.observed_at)
            }

            Err(_) => {
                let detail = if cycle_bound {
                    "collection cycle deadline passed before the app responded".to_string()
                } else {
                    format!("no response within {}s", self.app_timeout.as_secs_f64())
                };
                log::warn!(target: LOG_TARGET, "Timed out collecting rate limits for '{}': {detail}", self.identity.name());
                AppResult::failed(self.identity, FailureKind::Timeout, detail, self.observed_at)
            }
        }
    }

    /// Wait for a worker slot, giving up when the cycle deadline passes first.
    async fn acquire(&self, semaphore: Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
        let permit = match self.cycle_deadline {
            Some(deadline) => timeout_at(deadline, semaphore.acquire_owned()).await.ok()?,
            None => semaphore.acquire_owned().await,
        };

        Some(permit.expect("semaphore must not be closed"))
    }

    /// Resolve a credential valid at `now`, then query the rate-limit table with it.
    async fn observe(&self, now: DateTime<Utc>) -> Result<Vec<RateLimitSnapshot>, FetchError> {
        let credential = self.tokens.resolve(&self.identity, now).await?;

        match self.client.rate_limit(&credential.value).await {
            Err(e) if e.is_authentication() => {
                // The next cycle exchanges a new token instead of reusing the rejected one.
                self.tokens.invalidate(&credential);
                Err(e)
            }
            other => other,
        }
    }
}
