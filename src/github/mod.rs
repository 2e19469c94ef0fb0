//! GitHub API access
//!
//! A deliberately small client: it knows how to read the rate-limit table and how to create an
//! installation access token, and classifies every failure as an authentication, network, or
//! malformed-response error.

mod client;
mod error;
mod rate_limit;

pub use client::{Client, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, InstallationToken};
pub use error::FetchError;
pub use rate_limit::{GRAPHQL_RESOURCE, RateLimitSnapshot, parse_rate_limit};
