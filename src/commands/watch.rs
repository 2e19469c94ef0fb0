use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::metrics::server;
use clap::Parser;
use core::net::SocketAddr;
use core::time::Duration;
use ohno::IntoAppError;
use std::io::Write;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

const LOG_TARGET: &str = "     watch";

#[derive(Parser, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Seconds between collection cycles (overrides the configured interval)
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Serve Prometheus metrics at http://ADDR/metrics
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Don't print a report after each cycle
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Collect periodically until interrupted
pub async fn watch<H: Host>(host: &mut H, args: &WatchArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let listener = match args.listen {
        Some(addr) => Some(
            TcpListener::bind(addr)
                .await
                .into_app_err_with(|| format!("binding metrics listener to {addr}"))?,
        ),
        None => None,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!(target: LOG_TARGET, "Interrupt received, finishing the current cycle"),
            Err(e) => log::error!(target: LOG_TARGET, "Unable to listen for Ctrl+C, stopping: {e}"),
        }
        let _ = shutdown_tx.send(true);
    });

    let interval = args.interval.map_or(common.config.interval, Duration::from_secs);
    let result = watch_until(host, &common, interval, listener, !args.quiet, shutdown_rx).await;

    signal.abort();
    result.map(|_| ())
}

/// Run cycles every `interval` until `shutdown` turns true, optionally serving metrics on `listener`.
///
/// Returns the number of completed cycles.
pub async fn watch_until<H: Host>(
    host: &mut H,
    common: &Common,
    interval: Duration,
    listener: Option<TcpListener>,
    print_reports: bool,
    shutdown: watch::Receiver<bool>,
) -> Result<u64> {
    let scheduler = &common.scheduler;

    let server = listener.map(|listener| {
        tokio::spawn(server::serve(listener, Arc::clone(scheduler.registry()), shutdown.clone()))
    });

    let _ = writeln!(
        host.error(),
        "🔄 Monitoring {} app(s) every {}s. Press Ctrl+C to stop.",
        scheduler.identities().len(),
        interval.as_secs_f64()
    );

    let mut report_error = None;
    let cycles = scheduler
        .watch(interval, shutdown, |results| {
            if print_reports
                && report_error.is_none()
                && let Err(e) = common.report(host, results)
            {
                report_error = Some(e);
            }
        })
        .await;

    if let Some(server) = server {
        server.await.expect("task must not panic")?;
    }

    if let Some(e) = report_error {
        return Err(e);
    }

    let _ = writeln!(host.error(), "✅ Monitoring stopped after {cycles} cycle(s)");
    Ok(cycles)
}
