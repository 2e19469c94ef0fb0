//! GitHub App assertion signing.
//!
//! A GitHub App authenticates as itself with a JWT signed RS256 by the app's private key. GitHub rejects
//! assertions whose lifetime exceeds ten minutes, so every assertion is backdated by a minute to absorb
//! clock drift and expires nine minutes after it was signed.

use super::SecretToken;
use crate::Result;
use chrono::{DateTime, TimeDelta, Utc};
use core::fmt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How far `iat` is moved into the past.
const CLOCK_SKEW_SECS: i64 = 60;

/// How long after signing the assertion stays valid.
const ASSERTION_LIFETIME_SECS: i64 = 540;

/// A parsed GitHub App private key.
#[derive(Clone)]
pub struct AppKey(Arc<EncodingKey>);

impl AppKey {
    /// Parse an RSA private key in PEM form (PKCS#1 as downloaded from GitHub, or PKCS#8).
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem).into_app_err("parsing GitHub App private key (expected an RSA key in PEM format)")?;
        Ok(Self(Arc::new(key)))
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppKey(<redacted>)")
    }
}

/// Claim set of an app assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed app assertion, good for a single token exchange.
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    token: SecretToken,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SignedAssertion {
    #[must_use]
    pub const fn token(&self) -> &SecretToken {
        &self.token
    }

    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Sign an assertion for `app_id`, valid from a minute before `now` until nine minutes after it.
///
/// # Errors
///
/// Fails if the key cannot produce an RS256 signature.
pub fn sign(app_id: u64, key: &AppKey, now: DateTime<Utc>) -> Result<SignedAssertion> {
    let issued_at = now - TimeDelta::seconds(CLOCK_SKEW_SECS);
    let expires_at = now + TimeDelta::seconds(ASSERTION_LIFETIME_SECS);

    let claims = Claims {
        iss: app_id.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key.0)
        .into_app_err_with(|| format!("signing assertion for GitHub App {app_id}"))?;

    Ok(SignedAssertion {
        token: SecretToken::from(token),
        issued_at,
        expires_at,
    })
}
