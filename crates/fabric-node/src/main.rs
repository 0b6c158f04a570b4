//! # Fabric Node
//!
//! Serves the event fabric over HTTP and WebSocket.
//!
//! ```text
//! fabric-node [config.toml]
//! ```
//!
//! Without an argument the config path is read from `FABRIC_CONFIG`; with
//! neither, defaults apply. Telemetry is configured from the environment
//! (`FABRIC_LOG_LEVEL`, `FABRIC_JSON_LOGS`, `OTEL_EXPORTER_OTLP_ENDPOINT`).

use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_gateway::{serve, AppState, GatewayConfig};
use fabric_node::{build_service, builtin_registry};
use fabric_telemetry::{init_telemetry, TelemetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn load_config() -> Result<GatewayConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FABRIC_CONFIG").ok());
    match path {
        Some(path) => GatewayConfig::load(&path)
            .with_context(|| format!("Failed to load config from {path}")),
        None => {
            let config = GatewayConfig::default();
            config.validate().context("Invalid default config")?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("node"))
        .await
        .context("Failed to initialize telemetry")?;

    let config = load_config()?;
    let registry = Arc::new(builtin_registry().context("Failed to build event registry")?);
    let service = build_service(&config, registry);

    let shutdown = CancellationToken::new();
    let state = AppState {
        service,
        shutdown: shutdown.clone(),
    };
    let addr = config.http_addr();
    let mut server = tokio::spawn(serve(addr, state));

    info!(version = fabric_gateway::VERSION, addr = %addr, "Node is running. Press Ctrl+C to stop.");
    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Shutting down");
            shutdown.cancel();
            server.await
        }
        outcome = &mut server => outcome,
    };

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "Server failed");
            Err(e).context("Server failed")
        }
        Err(e) => Err(e).context("Server task panicked"),
    }
}
