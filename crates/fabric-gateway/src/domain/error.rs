//! Frontend error types.
//!
//! Every failure reaching a caller is an [`ApiError`] with a [`Code`]. Library
//! errors from the bus, the oracle and the authorizer convert into it.

use fabric_bus::BusError;
use fabric_types::{AuthError, DefinitionError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    InvalidArgument,
    PermissionDenied,
    FailedPrecondition,
    Unauthenticated,
    Internal,
    Cancelled,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::PermissionDenied => "permission_denied",
            Self::FailedPrecondition => "failed_precondition",
            Self::Unauthenticated => "unauthenticated",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
        }
    }

    /// HTTP status used when the error ends a plain request.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArgument => 400,
            Self::Unauthenticated => 401,
            Self::PermissionDenied => 403,
            Self::FailedPrecondition => 412,
            Self::Cancelled => 499,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the events frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: Code,
    pub message: String,
}

impl ApiError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, details)
    }

    pub fn permission_denied(details: impl Into<String>) -> Self {
        Self::new(Code::PermissionDenied, details)
    }

    pub fn failed_precondition(details: impl Into<String>) -> Self {
        Self::new(Code::FailedPrecondition, details)
    }

    pub fn unauthenticated(details: impl Into<String>) -> Self {
        Self::new(Code::Unauthenticated, details)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(Code::Internal, details)
    }

    pub fn cancelled() -> Self {
        Self::new(Code::Cancelled, "stream cancelled")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// Conversions from library errors

impl From<DefinitionError> for ApiError {
    fn from(e: DefinitionError) -> Self {
        ApiError::invalid_argument(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated => ApiError::unauthenticated(e.to_string()),
            AuthError::PermissionDenied(_) => ApiError::permission_denied(e.to_string()),
            AuthError::Lookup(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<BusError> for ApiError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::StorageDisabled => ApiError::failed_precondition(e.to_string()),
            BusError::Cancelled => ApiError::cancelled(),
            BusError::Backend(_) => ApiError::internal(e.to_string()),
        }
    }
}

/// Result type for frontend operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (startup and serving, not caller facing)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server bind error: {0}")]
    Bind(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid stream buffer bounds: {0}")]
    InvalidBuffer(String),

    #[error("invalid history settings: {0}")]
    InvalidHistory(String),

    #[error("invalid access grant: {0}")]
    InvalidGrant(String),
}
