//! # Edge Sink
//!
//! Test module that receives messages on one input and acknowledges each
//! only after it has been pending for a counter-dependent delay.
//!
//! Exit code 0 after Ctrl+C and a graceful shutdown; non-zero when
//! configuration, transport connection or input registration fails.

use anyhow::{Context, Result};
use tracing::{error, info};

use sink_runtime::{SinkConfig, SinkRuntime};
use sink_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    info!("Starting delayed-ack sink module");

    let config = SinkConfig::load()
        .map_err(|e| {
            error!(error = %e, "Invalid configuration");
            e
        })
        .context("Failed to load configuration")?;

    let mut runtime = SinkRuntime::new(config).map_err(|e| {
        error!(error = %format!("{e:#}"), "Bootstrap failed");
        e
    })?;
    runtime.start();

    info!("Sink is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    let report = runtime.shutdown().await?;
    info!(
        policy = ?report.policy,
        ticks = report.ticks,
        "Sink module exited"
    );

    Ok(())
}
