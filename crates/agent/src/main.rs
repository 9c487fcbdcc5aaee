//! Cluster monitoring agent
//!
//! Periodically snapshots the cluster's pods and usage metrics, joins them,
//! and forwards one document per container (and one per node) to
//! Elasticsearch.

use anyhow::Result;
use monitor_lib::{
    ClusterSource, ElasticsearchSink, KubeClusterSource, MetricsReporter, PoolConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting kube-monitor-agent");

    let config = config::AgentConfig::load()?;
    let sink = Arc::new(ElasticsearchSink::new(config.elastic())?);
    let cluster = KubeClusterSource::connect().await?;
    let reporter = MetricsReporter::new(
        sink,
        PoolConfig {
            workers: config.worker_threads,
            ..Default::default()
        },
    );

    info!(
        workers = config.worker_threads,
        interval_secs = config.cycle_seconds,
        index = %config.elastic_index,
        "Agent configured"
    );

    run(reporter, cluster, config.cycle_interval()).await;
    Ok(())
}

/// Poll loop: one collection cycle per tick until SIGINT.
async fn run<C: ClusterSource>(reporter: MetricsReporter, cluster: C, cycle: Duration) {
    let mut ticker = tokio::time::interval(cycle);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A listing failure is fatal for this cycle only.
                if let Err(err) = run_cycle(&reporter, &cluster).await {
                    error!(error = %err, "Collection cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    reporter.shutdown().await;
}

async fn run_cycle<C: ClusterSource>(reporter: &MetricsReporter, cluster: &C) -> Result<()> {
    info!("Running collection cycle");

    let pods = cluster.list_pods().await?;
    let pod_metrics = cluster.list_pod_metrics().await?;
    let node_metrics = cluster.list_node_metrics().await?;

    let summary = reporter.run_cycle(pods, pod_metrics, node_metrics).await;

    info!(
        pod_documents = summary.pod_documents,
        node_documents = summary.node_documents,
        dropped = summary.dropped,
        "Collection cycle complete"
    );
    Ok(())
}
