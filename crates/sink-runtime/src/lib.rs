//! # Edge Sink Runtime
//!
//! Wires the delayed-ack receiver and scheduler to a transport and owns the
//! process lifecycle.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `SINK_CONFIG_FILE`, `SINK_*` env)
//! 2. Connect the transport
//! 3. Register the receive callback on the configured input
//! 4. Spawn the scheduler (and the loopback feeder when enabled)
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to the feeder and the scheduler
//! 2. Await the scheduler's final drain / abandon pass
//! 3. Close the transport
//! 4. Release anything that slipped in between the final pass and close

pub mod container;
pub mod feeder;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use delayed_ack::{
    AckScheduler, InMemoryTransport, InputHandler, IntervalTicker, LoopbackMessage,
    MessageReceiver, ModuleTransport, ShutdownReport, SinkContext, SystemTimeSource,
    TransportError,
};

pub use crate::container::{FeedConfig, SinkConfig, TransportConfig};
use crate::container::config::LOOPBACK_TRANSPORT;

/// Connects the configured transport.
pub fn connect(config: &TransportConfig) -> Result<Arc<InMemoryTransport>, TransportError> {
    if config.kind != LOOPBACK_TRANSPORT {
        return Err(TransportError::ConnectionFailed(format!(
            "unsupported transport kind '{}'",
            config.kind
        )));
    }

    let transport = InMemoryTransport::new();
    transport.set_requires_pump(config.requires_pump);
    info!(kind = %config.kind, requires_pump = config.requires_pump, "Transport connected");
    Ok(Arc::new(transport))
}

/// The sink process: one transport, one input, one scheduler.
pub struct SinkRuntime {
    config: SinkConfig,
    transport: Arc<InMemoryTransport>,
    context: Arc<SinkContext<LoopbackMessage>>,
    clock: Arc<SystemTimeSource>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    scheduler_task: Option<JoinHandle<ShutdownReport>>,
    feeder_task: Option<JoinHandle<u64>>,
}

impl SinkRuntime {
    /// Connects the transport and registers the receive callback.
    ///
    /// Both steps are fatal on failure.
    pub fn new(config: SinkConfig) -> Result<Self> {
        let transport = connect(&config.transport).context("Failed to connect transport")?;

        let context: Arc<SinkContext<LoopbackMessage>> = Arc::new(SinkContext::new());
        let clock = Arc::new(SystemTimeSource);

        let receiver: Arc<dyn InputHandler<LoopbackMessage>> = Arc::new(MessageReceiver::new(
            Arc::clone(&context),
            Arc::clone(&clock),
            &config.input,
        ));
        transport
            .register_input(&config.input.name, receiver)
            .with_context(|| format!("Failed to register input '{}'", config.input.name))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            transport,
            context,
            clock,
            shutdown_tx,
            shutdown_rx,
            scheduler_task: None,
            feeder_task: None,
        })
    }

    /// Spawns the scheduler loop, plus the feeder when configured.
    pub fn start(&mut self) {
        if self.scheduler_task.is_some() {
            warn!("Sink runtime already started");
            return;
        }

        let ack_config = self.config.ack_config();
        let scheduler = AckScheduler::new(
            Arc::clone(&self.context),
            Arc::clone(&self.transport),
            Arc::clone(&self.clock),
            &ack_config,
        );
        let ticker = IntervalTicker::new(ack_config.scheduler.tick_interval());
        let shutdown = self.shutdown_rx.clone();
        self.scheduler_task = Some(tokio::spawn(async move {
            scheduler.run(ticker, shutdown).await
        }));

        let feed = self.config.transport.feed.clone();
        if feed.is_enabled() {
            info!(interval_ms = feed.interval_ms, "Starting loopback feeder");
            self.feeder_task = Some(tokio::spawn(feeder::run_feeder(
                Arc::clone(&self.transport),
                feed,
                self.shutdown_rx.clone(),
            )));
        }

        info!(
            input = %self.config.input.name,
            tick_interval_ms = self.config.scheduler.tick_interval_ms,
            low_delay_ms = self.config.delay.low_delay_ms,
            high_delay_ms = self.config.delay.high_delay_ms,
            slow_window_start = self.config.delay.slow_window_start,
            slow_window_end = self.config.delay.slow_window_end,
            "Sink runtime started"
        );
    }

    /// Stops the scheduler, settles what is left and closes the transport.
    pub async fn shutdown(&mut self) -> Result<ShutdownReport> {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        if let Some(feeder) = self.feeder_task.take() {
            match feeder.await {
                Ok(delivered) => debug!(delivered, "Feeder joined"),
                Err(e) => warn!(error = %e, "Feeder task failed"),
            }
        }

        let report = match self.scheduler_task.take() {
            Some(task) => task.await.context("Scheduler task failed")?,
            None => return Err(anyhow!("Sink runtime was not started")),
        };

        self.transport.close().await;

        // Arrivals after the scheduler's final pass. Close has waited for
        // in-flight deliveries, so nothing lands after this drain.
        let late = self.context.drain();
        if !late.is_empty() {
            warn!(
                count = late.len(),
                "Messages arrived after the final pass, releasing without disposition"
            );
            for entry in late {
                self.transport.destroy(entry.message);
            }
        }

        match sink_telemetry::gather_metrics() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to export metrics"),
        }

        info!(
            ticks = report.ticks,
            settled_on_shutdown = report.settled.len(),
            "Shutdown complete"
        );
        Ok(report)
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// The connected transport, for injecting traffic.
    pub fn transport(&self) -> Arc<InMemoryTransport> {
        Arc::clone(&self.transport)
    }

    pub fn pending_count(&self) -> usize {
        self.context.pending_count()
    }

    pub fn received_total(&self) -> u64 {
        self.context.received_total()
    }
}
