pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel, SinkConfig};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};

use crate::domain::Event;
use crate::sender::{ForwardClient, Transport};
use crate::sink::{FluentSink, SinkError};
use anyhow::Context;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one run over an event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Reads newline-delimited JSON events and hands each one to the sink.
///
/// This is the caller side of the sink contract: a failed send is logged
/// and counted, and the stream moves on. There is no retry.
pub struct App<T: Transport = ForwardClient> {
    config: Config,
    sink: FluentSink<T>,
}

impl App<ForwardClient> {
    pub fn from_config(config: Config) -> Result<Self, SinkError> {
        let sink = FluentSink::connect(&config.sink)?;
        Ok(Self { config, sink })
    }
}

impl<T: Transport> App<T> {
    pub fn with_sink(config: Config, sink: FluentSink<T>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sink(&self) -> &FluentSink<T> {
        &self.sink
    }

    /// Forward events from `reader` until EOF or until `shutdown` fires.
    pub async fn forward_events<R>(
        &self,
        reader: R,
        shutdown: CancellationToken,
    ) -> std::io::Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = RunSummary::default();
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping event intake");
                    break;
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                debug!("Event stream reached EOF");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let event = match Event::from_json(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed event: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.sink.send(&event).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    error!(
                        reason = %event.reason,
                        object = %event.involved_object.name,
                        "Failed to deliver event: {}",
                        e
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Close the sink. A close failure is logged; shutdown proceeds anyway.
    pub async fn close(self) {
        match self.sink.close().await {
            Ok(()) => info!("Sink closed"),
            Err(e) => error!("{}", e),
        }
    }
}

/// How long runtime shutdown waits for blocking work. A pending stdin read
/// sits on a blocking thread that cannot be interrupted.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Drive `future` on a fresh multi-threaded runtime, then shut the runtime
/// down without waiting longer than [`SHUTDOWN_GRACE`] for blocking threads.
pub fn run<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        // --help, --version and usage errors print and exit like any clap binary
        Err(ConfigError::ArgumentError(e)) => e.exit(),
        Err(e) => return Err(e).context("invalid configuration"),
    };

    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Warning: {e}");
    }

    info!("Starting fluent-event-sink v{}", get_version());
    info!(
        "Configuration: endpoint={}:{}, tag={}, de_dot={}, layout={}, format={:?}",
        config.sink.host,
        config.sink.port,
        config.sink.tag,
        config.sink.de_dot,
        config.sink.layout.is_some(),
        config.sink.format
    );

    let app = App::from_config(config).context("failed to create sink")?;

    let shutdown = CancellationToken::new();
    let signals = shutdown::spawn_signal_listener(shutdown.clone());

    let result = app
        .forward_events(BufReader::new(tokio::io::stdin()), shutdown.clone())
        .await;

    shutdown.cancel();
    if let Err(e) = signals.await {
        debug!("Signal listener ended abnormally: {}", e);
    }
    app.close().await;

    let summary = result.context("failed to read events from stdin")?;
    info!(
        "fluent-event-sink stopped: sent={}, failed={}, skipped={}",
        summary.sent, summary.failed, summary.skipped
    );
    Ok(())
}
