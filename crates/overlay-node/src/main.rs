use anyhow::{Context, Result};
use overlay_node::{NodeConfig, NodeRuntime};
use overlay_telemetry::{gather_metrics, init_telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    let mut runtime = NodeRuntime::new(config).context("Failed to build node runtime")?;
    runtime.start().await?;

    match gather_metrics() {
        Ok(snapshot) => info!("Metrics snapshot:\n{}", snapshot),
        Err(e) => warn!(error = %e, "Failed to gather metrics"),
    }

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
