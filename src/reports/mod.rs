//! Terminal reports of a collection cycle
//!
//! Two generators are provided, each accessed through a `generate` function:
//! - **Console**: per app and resource, the quota, its consumption, the reset time with a countdown,
//!   and a HEALTHY/WARNING/CRITICAL status, optionally colorized
//! - **JSON**: machine-readable structured data
//!
//! Both operate on the results of one cycle, in configuration order.

mod common;
mod console;
mod json;

pub use common::Health;
pub use console::generate as generate_console;
pub use json::generate as generate_json;
