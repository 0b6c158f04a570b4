//! # Fabric Telemetry
//!
//! Observability plumbing shared by the event fabric crates.
//!
//! ## Components
//!
//! - Console logging through `tracing-subscriber` (pretty or JSON)
//! - Optional trace export over OTLP
//! - Prometheus metrics for the bus, history store and gateway
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fabric_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).await?;
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, EVENTS_DELIVERED, EVENTS_DROPPED,
    EVENTS_INVISIBLE, EVENTS_PUBLISHED, EVENTS_REDACTED, HISTORY_FETCH_DURATION,
    HISTORY_RETAINED, STREAMS_ACTIVE, SUBSCRIPTIONS_ACTIVE,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Keeps telemetry alive. Drop to flush pending traces.
pub struct TelemetryGuard {
    _tracing: Option<TracingGuard>,
}

/// Initialize logging, optional trace export and metrics registration.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => Some(tracing_setup::init_tracing(&config, endpoint).await?),
        None => {
            init_logging(&config)?;
            None
        }
    };

    register_metrics()?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        trace_export = tracing.is_some(),
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _tracing: tracing })
}
