use super::signer;
use super::{AppKey, SecretToken};
use crate::config::{AppIdentity, Credentials};
use crate::github::{Client, FetchError};
use chrono::{DateTime, TimeDelta, Utc};

const LOG_TARGET: &str = "      auth";

/// A bearer credential ready to be presented to the API.
#[derive(Debug, Clone)]
pub struct CachedCredential {
    pub value: SecretToken,

    /// `None` for credentials that never expire (personal tokens).
    pub expires_at: Option<DateTime<Utc>>,

    pub identity: AppIdentity,
}

impl CachedCredential {
    /// Whether the credential can still be used at `now` without entering the refresh buffer.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, refresh_buffer: TimeDelta) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at - refresh_buffer)
    }
}

/// Produces credentials for identities: personal tokens directly, app installations by token exchange.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    client: Client,
}

impl CredentialResolver {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// The never-expiring credential of a personal-token identity, or `None` for app identities.
    #[must_use]
    pub fn static_credential(identity: &AppIdentity) -> Option<CachedCredential> {
        match identity.credentials() {
            Credentials::PersonalToken(token) => Some(wrap_static(identity, token)),
            Credentials::GitHubApp { .. } => None,
        }
    }

    /// Produce a fresh credential for `identity`.
    ///
    /// For app identities this signs a new assertion and exchanges it for an installation token, which
    /// always costs one request. Failures are returned as-is; nothing is retried.
    pub async fn resolve(&self, identity: &AppIdentity, now: DateTime<Utc>) -> Result<CachedCredential, FetchError> {
        match identity.credentials() {
            Credentials::PersonalToken(token) => Ok(wrap_static(identity, token)),
            Credentials::GitHubApp {
                app_id,
                installation_id,
                private_key,
            } => self.exchange(identity, *app_id, *installation_id, private_key, now).await,
        }
    }

    async fn exchange(
        &self,
        identity: &AppIdentity,
        app_id: u64,
        installation_id: u64,
        private_key: &AppKey,
        now: DateTime<Utc>,
    ) -> Result<CachedCredential, FetchError> {
        let assertion = signer::sign(app_id, private_key, now).map_err(FetchError::Authentication)?;

        log::debug!(
            target: LOG_TARGET,
            "Exchanging assertion of app {app_id} for an installation token for '{}'",
            identity.name()
        );

        let token = self
            .client
            .create_installation_token(installation_id, &assertion)
            .await
            .map_err(|e| e.enrich_with(|| format!("obtaining installation token for app '{}'", identity.name())))?;

        log::info!(
            target: LOG_TARGET,
            "Obtained installation token for '{}', expires at {}",
            identity.name(),
            token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedCredential {
            value: token.token,
            expires_at: Some(token.expires_at),
            identity: identity.clone(),
        })
    }
}

fn wrap_static(identity: &AppIdentity, token: &SecretToken) -> CachedCredential {
    CachedCredential {
        value: token.clone(),
        expires_at: None,
        identity: identity.clone(),
    }
}
