//! Collection of rate-limit data across all configured identities
//!
//! A collection cycle observes every identity exactly once: resolve a credential through the shared
//! token store, then query `/rate_limit` with it. Identities are processed by spawned tasks bounded by
//! a semaphore, each under its own timeout, and every outcome (success, classified failure, timeout,
//! or task failure) lands in that identity's [`AppResult`].

mod app_result;
mod collector;

pub use app_result::{AppFailure, AppResult, AppStatus, FailureKind};
pub use collector::{Collector, DEFAULT_APP_TIMEOUT, DEFAULT_CYCLE_TIMEOUT, DEFAULT_MAX_CONCURRENCY};
