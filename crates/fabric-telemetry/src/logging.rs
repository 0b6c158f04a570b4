//! Console logging.
//!
//! Installs the global `tracing` subscriber when no trace exporter is
//! configured. JSON output carries the same fields as the pretty format:
//! - `timestamp`, `level`, `target`
//! - the structured fields of each event (`name`, `subscription_id`, ...)

use tracing::Subscriber;
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::{TelemetryConfig, TelemetryError};

/// Filter from `RUST_LOG` if set, otherwise from the configured level.
pub(crate) fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Console formatter, pretty or JSON. `None` when console output is off.
pub(crate) fn console_layer<S>(config: &TelemetryConfig) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if !config.console_output {
        return None;
    }
    let layer = tracing_subscriber::fmt::layer().with_target(true);
    Some(if config.json_logs {
        layer
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        layer.boxed()
    })
}

/// Install the console subscriber.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(console_layer(config))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
