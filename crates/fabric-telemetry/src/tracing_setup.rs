//! OpenTelemetry trace export.
//!
//! Used when `OTEL_EXPORTER_OTLP_ENDPOINT` is configured: spans go to the
//! OTLP collector, log lines still go to the console layer.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::logging::{console_layer, env_filter};
use crate::{TelemetryConfig, TelemetryError};

/// Shuts the tracer provider down on drop, flushing pending spans.
pub struct TracingGuard {
    provider: trace::TracerProvider,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

/// Install the subscriber with OTLP export to `endpoint`.
pub async fn init_tracing(
    config: &TelemetryConfig,
    endpoint: &str,
) -> Result<TracingGuard, TelemetryError> {
    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(trace::Config::default().with_resource(Resource::new(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])))
        .install_batch(runtime::Tokio)
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    let tracer = provider.tracer(config.service_name.clone());

    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(console_layer(config))
        .try_init()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(otlp_endpoint = %endpoint, "Trace export enabled");
    Ok(TracingGuard { provider })
}
