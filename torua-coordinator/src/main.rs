use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use torua_coordinator::{http, Args, Broadcaster, ClusterManager, CoordinatorConfig, HealthMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let coord_config = match &args.config {
        Some(path) => CoordinatorConfig::from_file(path)?,
        None => CoordinatorConfig::default(),
    };

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::new(&log_level);
    let registry = tracing_subscriber::registry().with(env_filter);

    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let metrics_handle = if args.metrics_enabled {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus metrics recorder");
        tracing::info!("Prometheus metrics enabled at /metrics");
        Some(handle)
    } else {
        None
    };

    tracing::info!(shard_count = args.shard_count, listen_addr = %args.listen_addr, "starting torua-coordinator");

    let cluster = Arc::new(ClusterManager::new(args.shard_count));
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(coord_config.forward_timeout_secs))
        .build()?;
    let broadcaster = Broadcaster::new(client.clone(), Duration::from_secs(coord_config.broadcast_timeout_secs));

    let monitor = HealthMonitor::new(cluster.clone(), broadcaster.clone(), client.clone(), &coord_config);
    let health_handle = monitor.start();

    let state = http::AppState {
        cluster,
        broadcaster,
        client,
        config: Arc::new(coord_config),
        metrics_handle,
    };

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(addr = %args.listen_addr, "coordinator listening");

    let serve = axum::serve(listener, app);
    tokio::select! {
        result = serve => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    monitor.stop();
    health_handle.await.ok();

    Ok(())
}
