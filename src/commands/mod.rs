//! Command-line interface and orchestration for gh-rate-monitor
//!
//! This module implements the CLI commands and wires the other modules together
//! to perform end-to-end rate-limit collection and reporting.
//!
//! # Implementation Model
//!
//! ## Commands
//!
//! - **check**: Run one collection cycle over every configured identity, print a
//!   report, and exit non-zero if any app could not be checked
//! - **watch**: Run collection cycles on a fixed interval until interrupted,
//!   optionally serving the metrics over HTTP
//! - **init**: Generate a default configuration file
//! - **validate**: Check configuration syntax and build every identity it describes
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes
//! to the appropriate command handler. The collecting commands share one path:
//!
//! 1. Initialize logging and load the configuration
//! 2. Build identities, the GitHub client, the token store, and the collector
//! 3. Run one or more cycles through the scheduler, updating the metrics registry
//! 4. Render console or JSON reports through the host
//!
//! The `common` module holds the shared setup and report logic.

mod check;
mod common;
mod host;
mod init;
mod run;
mod validate;
mod watch;

pub use check::{CheckArgs, check};
pub use common::{Common, CommonArgs, build_scheduler};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use run::run;
pub use validate::{ValidateArgs, validate_config};
pub use watch::{WatchArgs, watch, watch_until};
