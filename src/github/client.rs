//! GitHub API client
//!
//! Minimal GitHub API client for the two endpoints the monitor talks to: the rate-limit table and
//! installation access token creation. No retries happen here; a failed call is classified and
//! handed back so the caller can isolate it.

use super::error::FetchError;
use super::rate_limit::{RateLimitSnapshot, parse_rate_limit};
use crate::auth::{SecretToken, SignedAssertion};
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

const LOG_TARGET: &str = "    github";

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default bound on a single HTTP request, connect through body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gh-rate-monitor/", env!("CARGO_PKG_VERSION"));

/// Installation access token as returned by GitHub.
#[derive(Debug, Deserialize)]
pub struct InstallationToken {
    pub token: SecretToken,
    pub expires_at: DateTime<Utc>,
}

/// Error body GitHub attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Endpoint a response came from, which decides how its failure statuses are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    RateLimit,
    AccessTokens,
}

/// GitHub API client
#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a client for the API rooted at `base_url`, bounding every request by `request_timeout`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let _ = headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL for this client
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the per-resource quota table for the identity owning `token`.
    pub async fn rate_limit(&self, token: &SecretToken) -> Result<Vec<RateLimitSnapshot>, FetchError> {
        let url = format!("{}/rate_limit", self.base_url);
        let resp = self.send(self.client.get(&url), token, Endpoint::RateLimit).await?;

        let body = resp.bytes().await.map_err(|e| FetchError::Network(e.into()))?;
        parse_rate_limit(&body).map_err(FetchError::MalformedResponse)
    }

    /// Exchange an app assertion for an access token scoped to `installation_id`.
    pub async fn create_installation_token(
        &self,
        installation_id: u64,
        assertion: &SignedAssertion,
    ) -> Result<InstallationToken, FetchError> {
        let url = format!("{}/app/installations/{installation_id}/access_tokens", self.base_url);
        let resp = self
            .send(self.client.post(&url), assertion.token(), Endpoint::AccessTokens)
            .await?;

        let body = resp.bytes().await.map_err(|e| FetchError::Network(e.into()))?;
        serde_json::from_slice(&body)
            .into_app_err("parsing installation token response")
            .map_err(FetchError::MalformedResponse)
    }

    async fn send(&self, request: RequestBuilder, bearer: &SecretToken, endpoint: Endpoint) -> Result<Response, FetchError> {
        let mut auth_val = HeaderValue::from_str(&format!("Bearer {}", bearer.expose()))
            .map_err(|e| FetchError::Authentication(app_err!("credential cannot be sent as a header: {e}")))?;
        auth_val.set_sensitive(true);

        let resp = request
            .header(AUTHORIZATION, auth_val)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.into()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let path = resp.url().path().to_string();
        let message = resp
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<ErrorBody>(&text).ok())
            .map(|body| body.message);

        log::debug!(target: LOG_TARGET, "GitHub responded to '{path}' with HTTP {status}");

        let error = message.map_or_else(
            || app_err!("GitHub responded to '{path}' with HTTP {status}"),
            |message| app_err!("GitHub responded to '{path}' with HTTP {status}: {message}"),
        );

        Err(classify(status, endpoint, error))
    }
}

/// Map a failure status to the error taxonomy.
fn classify(status: StatusCode, endpoint: Endpoint, error: ohno::AppError) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Authentication(error),

        // Unknown installation, or an installation that belongs to another app.
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY if endpoint == Endpoint::AccessTokens => {
            FetchError::Authentication(error)
        }

        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => FetchError::Network(error),
        s if s.is_server_error() => FetchError::Network(error),

        _ => FetchError::MalformedResponse(error),
    }
}
