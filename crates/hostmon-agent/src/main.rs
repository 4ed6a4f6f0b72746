use anyhow::{Context, Result};
use hostmon_agent::{AgentConfig, CollectorLoop, HttpSink, LoopSettings};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hostmon=info".parse()?))
        .init();

    let config_path = std::env::args().nth(1);
    let config = AgentConfig::resolve(config_path.as_deref())?;
    let settings = LoopSettings::from_config(&config);

    tracing::info!(
        resource_id = %settings.resource_id,
        endpoint = %config.endpoint,
        interval_secs = config.collection_interval_secs,
        timeout_secs = config.request_timeout_secs,
        proc_root = %config.proc_root.display(),
        "hostmon-agent starting"
    );

    let sink = Arc::new(HttpSink::from_config(&config)?);
    let sources = hostmon_collector::default_sources(&config.proc_root)
        .context("procfs counters unavailable, hostmon-agent supports Linux hosts only")?;
    let collector = CollectorLoop::new(settings, sources, sink);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutting down gracefully");
        let _ = stop_tx.send(true);
    });

    collector.run(stop_rx).await;
    Ok(())
}
