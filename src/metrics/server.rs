use super::MetricsRegistry;
use super::exposition::CONTENT_TYPE;
use crate::Result;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use ohno::IntoAppError;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

const LOG_TARGET: &str = "    server";

/// Routes for scraping the registry: `GET /metrics` and `GET /healthz`.
pub fn router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(registry)
}

/// Serve [`router`] on `listener` until `shutdown` turns true.
///
/// In-flight scrapes are allowed to complete before this returns.
pub async fn serve(listener: TcpListener, registry: Arc<MetricsRegistry>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let addr = listener.local_addr().into_app_err("determining metrics listener address")?;
    log::info!(target: LOG_TARGET, "Serving metrics on http://{addr}/metrics");

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            log::info!(target: LOG_TARGET, "Metrics server shutting down");
        })
        .await
        .into_app_err_with(|| format!("serving metrics on {addr}"))
}

async fn metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], registry.render())
}

async fn healthz() -> &'static str {
    "ok"
}
