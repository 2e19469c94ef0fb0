use super::{CachedCredential, CredentialResolver};
use crate::config::AppIdentity;
use crate::github::FetchError;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

const LOG_TARGET: &str = "    tokens";

/// Default margin before expiry at which a cached installation token is treated as stale.
pub const DEFAULT_REFRESH_BUFFER: TimeDelta = TimeDelta::minutes(5);

/// Cache entry of a single identity.
///
/// `current` is only ever held for a copy in or out. `refresh` is held across the token exchange so
/// that exactly one caller per identity talks to GitHub while the others wait and then reuse its result.
#[derive(Debug, Default)]
struct Slot {
    current: RwLock<Option<CachedCredential>>,
    refresh: tokio::sync::Mutex<()>,
}

impl Slot {
    fn fresh(&self, now: DateTime<Utc>, refresh_buffer: TimeDelta) -> Option<CachedCredential> {
        self.current
            .read()
            .expect("lock not poisoned")
            .as_ref()
            .filter(|credential| credential.is_fresh(now, refresh_buffer))
            .cloned()
    }
}

/// Process-wide cache of installation tokens, one per identity name.
///
/// Shared by all collection tasks within and across cycles. Locking is per identity: refreshing one
/// app's token never waits on another app's refresh.
#[derive(Debug)]
pub struct TokenStore {
    resolver: CredentialResolver,
    refresh_buffer: TimeDelta,
    slots: Mutex<HashMap<Arc<str>, Arc<Slot>>>,
}

impl TokenStore {
    #[must_use]
    pub fn new(resolver: CredentialResolver, refresh_buffer: TimeDelta) -> Self {
        Self {
            resolver,
            refresh_buffer,
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn refresh_buffer(&self) -> TimeDelta {
        self.refresh_buffer
    }

    /// Return a usable credential for `identity`, exchanging a new installation token only when the
    /// cached one is missing or within the refresh buffer of its expiry.
    ///
    /// Personal tokens are returned directly and never cached or exchanged.
    pub async fn resolve(&self, identity: &AppIdentity, now: DateTime<Utc>) -> Result<CachedCredential, FetchError> {
        if let Some(credential) = CredentialResolver::static_credential(identity) {
            return Ok(credential);
        }

        let slot = self.slot(identity);
        if let Some(credential) = slot.fresh(now, self.refresh_buffer) {
            return Ok(credential);
        }

        let _refresh = slot.refresh.lock().await;

        // Someone else may have refreshed while we were waiting for the lock.
        if let Some(credential) = slot.fresh(now, self.refresh_buffer) {
            log::debug!(target: LOG_TARGET, "Reusing token refreshed concurrently for '{}'", identity.name());
            return Ok(credential);
        }

        log::debug!(target: LOG_TARGET, "Token for '{}' is missing or stale, refreshing", identity.name());
        let credential = self.resolver.resolve(identity, now).await?;
        *slot.current.write().expect("lock not poisoned") = Some(credential.clone());

        Ok(credential)
    }

    /// Drop `credential` from the cache if it is still the cached one, forcing the next
    /// [`resolve`](Self::resolve) for its identity to exchange a new token.
    pub fn invalidate(&self, credential: &CachedCredential) {
        let Some(slot) = self.existing_slot(credential.identity.name()) else {
            return;
        };

        let mut current = slot.current.write().expect("lock not poisoned");
        if current.as_ref().is_some_and(|cached| cached.value == credential.value) {
            log::debug!(target: LOG_TARGET, "Invalidating rejected token for '{}'", credential.identity.name());
            *current = None;
        }
    }

    /// Expiry of the token currently cached for `name`, if any.
    #[must_use]
    pub fn cached_expiry(&self, name: &str) -> Option<DateTime<Utc>> {
        self.existing_slot(name)?
            .current
            .read()
            .expect("lock not poisoned")
            .as_ref()
            .and_then(|credential| credential.expires_at)
    }

    fn slot(&self, identity: &AppIdentity) -> Arc<Slot> {
        let mut slots = self.slots.lock().expect("lock not poisoned");
        Arc::clone(slots.entry(Arc::clone(identity.name_arc())).or_default())
    }

    fn existing_slot(&self, name: &str) -> Option<Arc<Slot>> {
        self.slots.lock().expect("lock not poisoned").get(name).map(Arc::clone)
    }
}
