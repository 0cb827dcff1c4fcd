//! Remote Photo Show
//!
//! Serves a photo show whose current picture is driven by one master
//! controller and pushed to every viewer over server-sent events.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use remotephoto_server::{run_server, AppState, Cli, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    let addr = config.socket_addr()?;
    info!("Photo directory: {}", config.photo_dir.display());
    info!("Step mode: {:?}", config.step_mode);
    info!("Client queues: {:?}", config.stream.queue_policy());

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Initialize the show
    let state = AppState::new(config, metrics_handle);
    state.show.reset().await;

    run_server(state, addr).await
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("remotephoto=debug,remotephoto_core=debug,remotephoto_server=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("remotephoto=info,remotephoto_core=info,remotephoto_server=info")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_gauge!(
        "remotephoto_clients_connected",
        "Number of viewers currently streaming events"
    );
    metrics::describe_counter!(
        "remotephoto_events_published_total",
        "Show events published, by event type"
    );
    metrics::describe_counter!(
        "remotephoto_clients_dropped_total",
        "Viewers disconnected because their event queue overflowed"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
