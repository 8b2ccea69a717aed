//! irreceive: bridge an infrared remote producer to a JSON event stream
//!
//! Runs the configured producer (`irw` by default) through the shared
//! lifecycle manager, registers one listener and writes every matching
//! event to stdout as a JSON object per line. Logs go to stderr.
//!
//! Exits cleanly on SIGINT/SIGTERM and with an error if the producer exits.
//!
//! Configuration comes from the environment, see [`config::Config`].

mod config;

use std::io;

use anyhow::{anyhow, Context, Result};
use irreceive::{IrEvent, IrReceiver};
use tokio::io::AsyncWriteExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries events only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "irreceive starting"
    );

    let config = Config::load()?;
    info!(
        producer = %config.producer,
        key = ?config.key,
        remote = ?config.remote,
        throttle_ms = ?config.throttle_ms,
        "configuration loaded"
    );

    irreceive::set_spawn_strategy(config.spawn_strategy());

    let receiver = IrReceiver::new();

    let (listener, mut events) = receiver
        .subscribe(config.filter(), config.throttle_ms)
        .context("failed to start producer")?;

    info!(%listener, "listening for remote events");

    let outcome = tokio::select! {
        result = forward_events(&mut events) => {
            // The channel only closes when the producer exits
            result.and_then(|()| Err(anyhow!("producer `{}` exited", config.producer)))
        }

        result = shutdown_signal() => {
            result
                .map(|name| info!(signal = name, "shutdown signal received"))
                .context("failed to register signal handlers")
        }
    };

    // Removing the last listener stops the producer
    info!("shutting down...");
    receiver.remove_listener(listener);

    match &outcome {
        Ok(()) => info!("irreceive stopped"),
        Err(e) => error!("irreceive stopped: {e:#}"),
    }

    outcome
}

/// Wait for SIGTERM or SIGINT and name the one received
async fn shutdown_signal() -> io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        _ = interrupt.recv() => "SIGINT",
    };
    debug!(signal = name, "signal caught");
    Ok(name)
}

/// Write each event to stdout as one JSON line
async fn forward_events(events: &mut mpsc::UnboundedReceiver<IrEvent>) -> Result<()> {
    let mut stdout = tokio::io::stdout();

    while let Some(event) = events.recv().await {
        debug!(%event, "event received");

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        stdout
            .write_all(&line)
            .await
            .context("failed to write event")?;
        stdout.flush().await?;
    }

    Ok(())
}
