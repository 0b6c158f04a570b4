//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging, trace export and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// OpenTelemetry OTLP endpoint. `None` disables trace export.
    pub otlp_endpoint: Option<String>,

    /// Log level filter (trace, debug, info, warn, error) or full directive
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,

    /// Deployment environment (development, staging, production)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "event-fabric".to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            environment: "development".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: event-fabric)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: unset, no export)
    /// - `FABRIC_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `FABRIC_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `FABRIC_JSON_LOGS`: JSON logs (default: false in dev, true in containers)
    /// - `FABRIC_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "event-fabric".to_string()),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.is_empty()),

            log_level: env::var("FABRIC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("FABRIC_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("FABRIC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            environment: env::var("FABRIC_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Configuration for a named component, e.g. `gateway`.
    pub fn for_component(component: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("{}-{}", config.service_name, component);
        config
    }
}
