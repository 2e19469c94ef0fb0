use crate::Result;
use crate::auth::{AppKey, SecretToken};
use core::fmt;
use ohno::bail;
use serde::Deserialize;
use std::sync::Arc;

/// Which authentication flow an identity uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "personal_token")]
    PersonalToken,

    #[serde(rename = "github_app")]
    GitHubApp,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersonalToken => f.write_str("personal_token"),
            Self::GitHubApp => f.write_str("github_app"),
        }
    }
}

/// Method-specific credential material of an identity.
#[derive(Debug, Clone)]
pub enum Credentials {
    PersonalToken(SecretToken),
    GitHubApp {
        app_id: u64,
        installation_id: u64,
        private_key: AppKey,
    },
}

/// A configured GitHub identity whose rate limits are monitored.
///
/// Built once at startup and never mutated; clones share the same underlying data.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    name: Arc<str>,
    credentials: Arc<Credentials>,
}

impl AppIdentity {
    /// An identity that authenticates with a personal access token.
    pub fn personal_token(name: impl AsRef<str>, token: SecretToken) -> Result<Self> {
        let name = validate_name(name.as_ref())?;
        if token.is_empty() {
            bail!("app '{name}': personal token is empty");
        }

        Ok(Self {
            name,
            credentials: Arc::new(Credentials::PersonalToken(token)),
        })
    }

    /// An identity that authenticates as a GitHub App installation.
    pub fn github_app(name: impl AsRef<str>, app_id: u64, installation_id: u64, private_key: AppKey) -> Result<Self> {
        let name = validate_name(name.as_ref())?;
        if app_id == 0 {
            bail!("app '{name}': app_id must be a positive integer");
        }
        if installation_id == 0 {
            bail!("app '{name}': installation_id must be a positive integer");
        }

        Ok(Self {
            name,
            credentials: Arc::new(Credentials::GitHubApp {
                app_id,
                installation_id,
                private_key,
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn auth_method(&self) -> AuthMethod {
        match *self.credentials {
            Credentials::PersonalToken(_) => AuthMethod::PersonalToken,
            Credentials::GitHubApp { .. } => AuthMethod::GitHubApp,
        }
    }

    #[must_use]
    pub fn app_id(&self) -> Option<u64> {
        match *self.credentials {
            Credentials::GitHubApp { app_id, .. } => Some(app_id),
            Credentials::PersonalToken(_) => None,
        }
    }

    #[must_use]
    pub fn installation_id(&self) -> Option<u64> {
        match *self.credentials {
            Credentials::GitHubApp { installation_id, .. } => Some(installation_id),
            Credentials::PersonalToken(_) => None,
        }
    }
}

fn validate_name(name: &str) -> Result<Arc<str>> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("app name must not be empty");
    }
    if trimmed.chars().any(char::is_control) {
        bail!("app name '{}' contains control characters", trimmed.escape_debug());
    }
    Ok(Arc::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app-key.pem"));

    #[test]
    fn test_personal_token_identity() {
        let identity = AppIdentity::personal_token("ops", SecretToken::new("ghp_x")).unwrap();
        assert_eq!(identity.name(), "ops");
        assert_eq!(identity.auth_method(), AuthMethod::PersonalToken);
        assert_eq!(identity.app_id(), None);
        assert_eq!(identity.installation_id(), None);
    }

    #[test]
    fn test_github_app_identity() {
        let key = AppKey::from_pem(PRIVATE_KEY).unwrap();
        let identity = AppIdentity::github_app(" ci-bot ", 12, 34, key).unwrap();
        assert_eq!(identity.name(), "ci-bot");
        assert_eq!(identity.auth_method(), AuthMethod::GitHubApp);
        assert_eq!(identity.app_id(), Some(12));
        assert_eq!(identity.installation_id(), Some(34));
    }

    #[test]
    fn test_rejects_empty_name() {
        let _ = AppIdentity::personal_token("   ", SecretToken::new("ghp_x")).unwrap_err();
    }

    #[test]
    fn test_rejects_empty_token() {
        let _ = AppIdentity::personal_token("ops", SecretToken::new("")).unwrap_err();
    }

    #[test]
    fn test_rejects_zero_ids() {
        let key = AppKey::from_pem(PRIVATE_KEY).unwrap();
        let _ = AppIdentity::github_app("a", 0, 34, key.clone()).unwrap_err();
        let _ = AppIdentity::github_app("a", 12, 0, key).unwrap_err();
    }

    #[test]
    fn test_debug_hides_secrets() {
        let identity = AppIdentity::personal_token("ops", SecretToken::new("ghp_topsecret")).unwrap();
        assert!(!format!("{identity:?}").contains("ghp_topsecret"));
    }

    #[test]
    fn test_auth_method_display() {
        assert_eq!(AuthMethod::PersonalToken.to_string(), "personal_token");
        assert_eq!(AuthMethod::GitHubApp.to_string(), "github_app");
    }
}
