use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use torua_node::agent::{register_with_backoff, NodeAgent};
use torua_node::{http, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

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

    tracing::info!(node_id = %args.node_id, shards = ?args.shard_ids, "starting torua-node");

    let agent = Arc::new(NodeAgent::new(args.node_id.clone(), &args.shard_ids));
    let client = reqwest::Client::new();
    let advertise_addr = args.advertise_address();

    {
        let client = client.clone();
        let coordinator_addr = args.coordinator_addr.clone();
        let node_id = args.node_id.clone();
        let advertise_addr = advertise_addr.clone();
        let timeout = Duration::from_secs(args.register_timeout_secs);
        tokio::spawn(async move {
            register_with_backoff(&client, &coordinator_addr, &node_id, &advertise_addr, timeout).await;
        });
    }

    let state = http::AppState {
        agent,
        max_value_bytes: args.max_value_bytes,
        metrics_handle,
    };
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(addr = %args.listen_addr, "node listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    Ok(())
}
