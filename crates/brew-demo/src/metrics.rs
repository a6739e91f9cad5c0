//! Metrics export for the demo.
//!
//! The client records through the `metrics` facade; this installs the
//! Prometheus exporter that serves them.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Start the Prometheus metrics server and describe the client metrics.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    brew_client::metrics::describe_metrics();

    info!("Metrics server listening on {}", addr);
    Ok(())
}
