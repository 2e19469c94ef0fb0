//! Configuration
//!
//! The TOML configuration file is parsed once at startup and turned into validated [`AppIdentity`]
//! values. Anything wrong with it (missing fields, unreadable or malformed keys, duplicate names, no
//! apps at all) is a fatal error reported before any collection starts.

mod app_identity;
#[expect(clippy::module_inception, reason = "config module holds the Config type")]
mod config;

pub use app_identity::{AppIdentity, AuthMethod, Credentials};
pub use config::{AppEntry, Config, CredentialOverrides, DEFAULT_CONFIG_FILE, DEFAULT_CONFIG_TOML};
