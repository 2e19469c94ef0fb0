//! gh-rate-monitor crate
//!
//! This crate is an implementation detail of the `gh-rate-monitor` tool. Its API is fluid and may change
//! without warning and in a semver-incompatible way.
//!
//! # Module Organization
//!
//! - [`auth`]: App JWT signing, installation token exchange, and the per-identity token store
//! - [`github`]: Minimal GitHub API client for the rate-limit and access-token endpoints
//! - [`collect`]: Concurrent, failure-isolated collection across all configured identities
//! - [`metrics`]: The exported metric model and its Prometheus text rendering
//! - [`scheduler`]: Single-shot and periodic collection cycles
//! - [`config`]: Configuration loading into validated [`config::AppIdentity`] values
//! - [`reports`]: Console and JSON reports of a collection cycle
//! - [`commands`]: Command-line interface and orchestration

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod auth;

#[doc(hidden)]
pub mod collect;

#[doc(hidden)]
pub mod commands;

#[doc(hidden)]
pub mod config;

#[doc(hidden)]
pub mod github;

#[doc(hidden)]
pub mod metrics;

#[doc(hidden)]
pub mod reports;

#[doc(hidden)]
pub mod scheduler;

pub use crate::commands::{Host, run};
