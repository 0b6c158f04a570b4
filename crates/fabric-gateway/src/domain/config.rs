//! Gateway configuration with validation.
//!
//! Loaded from TOML. Durations use humantime notation (`"10m"`, `"30s"`).
//!
//! ```toml
//! origin = "eu1.example.net"
//!
//! [http]
//! port = 1885
//!
//! [history]
//! retention = "15m"
//!
//! [[access]]
//! subject = "alice"
//! entity = { entity_type = "application", application_id = "app1" }
//! rights = ["application_all"]
//! ```

use crate::domain::error::ConfigError;
use fabric_bus::StoreConfig;
use fabric_types::{EntityIdentifiers, EntityType, Rights};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host name stamped on events published without an origin
    pub origin: String,
    /// HTTP/WebSocket server configuration
    pub http: HttpConfig,
    /// Stream delivery buffer bounds
    pub stream: StreamConfig,
    /// In-memory history
    pub history: HistoryConfig,
    /// Static rights table
    pub access: Vec<AccessGrant>,
}

impl GatewayConfig {
    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.min_buffer == 0 {
            return Err(ConfigError::InvalidBuffer(
                "min_buffer cannot be 0".into(),
            ));
        }
        if self.stream.min_buffer > self.stream.max_buffer {
            return Err(ConfigError::InvalidBuffer(format!(
                "min_buffer {} exceeds max_buffer {}",
                self.stream.min_buffer, self.stream.max_buffer
            )));
        }

        if self.history.enabled {
            if self.history.capacity == 0 {
                return Err(ConfigError::InvalidHistory(
                    "capacity cannot be 0".into(),
                ));
            }
            if self.history.retention.is_zero() {
                return Err(ConfigError::InvalidHistory(
                    "retention cannot be 0".into(),
                ));
            }
            if self.history.live_buffer == 0 {
                return Err(ConfigError::InvalidHistory(
                    "live_buffer cannot be 0".into(),
                ));
            }
        }

        for grant in &self.access {
            if grant.subject.is_empty() {
                return Err(ConfigError::InvalidGrant("empty subject".into()));
            }
            if grant.entity.entity_type() == EntityType::EndDevice {
                return Err(ConfigError::InvalidGrant(format!(
                    "{} is an end device, grant rights on its application instead",
                    grant.entity
                )));
            }
            if grant.rights.is_empty() {
                return Err(ConfigError::InvalidGrant(format!(
                    "no rights for {} on {}",
                    grant.subject, grant.entity
                )));
            }
        }

        Ok(())
    }

    /// HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 1885)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 1885,
        }
    }
}

/// Delivery buffer bounds of a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub min_buffer: usize,
    pub max_buffer: usize,
}

impl StreamConfig {
    /// Delivery buffer for a stream asking for `tail` events.
    pub fn buffer_for(&self, tail: usize) -> usize {
        tail.clamp(self.min_buffer, self.max_buffer)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_buffer: 8,
            max_buffer: 1024,
        }
    }
}

/// In-memory history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Keep history. Without it the backend is ephemeral.
    pub enabled: bool,
    /// Maximum retained events
    pub capacity: usize,
    /// Retention of events
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    /// Live buffer of history subscriptions
    pub live_buffer: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            enabled: true,
            capacity: store.capacity,
            retention: store.retention,
            live_buffer: store.live_buffer,
        }
    }
}

impl HistoryConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            capacity: self.capacity,
            retention: self.retention,
            live_buffer: self.live_buffer,
        }
    }
}

/// Rights granted to a subject on one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub subject: String,
    pub entity: EntityIdentifiers,
    pub rights: Rights,
}
