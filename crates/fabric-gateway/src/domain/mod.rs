//! Domain types for the events frontend: configuration, errors and the
//! wire format.

pub mod config;
pub mod correlation;
pub mod error;
pub mod wire;

pub use config::{AccessGrant, GatewayConfig, HistoryConfig, HttpConfig, StreamConfig};
pub use correlation::CorrelationId;
pub use error::{ApiError, ApiResult, Code, ConfigError, GatewayError};
pub use wire::{FindRelatedRequest, FindRelatedResponse, StreamFrame, StreamRequest, WireEvent};
