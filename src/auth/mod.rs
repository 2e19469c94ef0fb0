//! Credentials for the GitHub API
//!
//! This module turns a configured [`AppIdentity`](crate::config::AppIdentity) into a bearer
//! credential that can be presented to the rate-limit endpoint.
//!
//! # Implementation Model
//!
//! - [`signer`] produces the short-lived RS256 assertion a GitHub App uses to authenticate as itself.
//! - [`CredentialResolver`] exchanges that assertion for an installation access token, or passes a
//!   personal token straight through.
//! - [`TokenStore`] caches one credential per identity and refreshes it a fixed buffer ahead of its
//!   expiry. Refreshes are serialized per identity, so concurrent callers that observe the same stale
//!   token trigger a single exchange while other identities refresh independently.

mod resolver;
mod secret;
pub mod signer;
mod token_store;

pub use resolver::{CachedCredential, CredentialResolver};
pub use secret::SecretToken;
pub use signer::{AppKey, SignedAssertion};
pub use token_store::{DEFAULT_REFRESH_BUFFER, TokenStore};
