//! The exported metric model
//!
//! After every collection cycle the [`MetricsRegistry`] folds the cycle's results into a fresh
//! [`MetricsSnapshot`] and publishes it with a pointer swap. The snapshot is rendered in the Prometheus
//! text format by [`exposition`] and served over HTTP by [`server`].
//!
//! Series:
//!
//! - `github_app_status{app_name, app_id, installation_id}`: 1 when the last cycle succeeded
//! - `github_rate_limit_{limit,remaining,used,reset}{app_name, app_id, installation_id, resource}`
//! - `github_graphql_rate_limit_{limit,remaining,used}{app_name, app_id, installation_id}`

pub mod exposition;
mod registry;
pub mod server;

pub use registry::{AppLabels, AppSeries, MetricsRegistry, MetricsSnapshot, ResourceGauges};
