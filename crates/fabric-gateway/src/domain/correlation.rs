//! Correlation ids minted by the frontend.
//!
//! Uses UUID v7 so ids sort by creation time.

use std::fmt;
use uuid::Uuid;

/// Correlation id with a short namespace prefix, e.g. `events:stream:<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    namespace: &'static str,
    id: Uuid,
}

impl CorrelationId {
    /// Fresh id in `namespace`.
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            id: Uuid::now_v7(),
        }
    }

    /// Id attached to the start event of a stream.
    pub fn for_stream() -> Self {
        Self::new("events:stream")
    }

    /// Id attached to a plain request.
    pub fn for_request() -> Self {
        Self::new("events:request")
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

/// Split a comma separated `X-Correlation-Id` header value.
pub fn parse_header(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
