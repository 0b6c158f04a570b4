//! JSON wire format of the events frontend.
//!
//! Private caller metadata is omitted when absent, which is always the case
//! for redacted events.

use crate::domain::error::ApiError;
use chrono::{DateTime, Utc};
use fabric_types::{Authentication, EntityIdentifiers, Event, Rights};
use serde::{Deserialize, Serialize};

/// Event as sent to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub unique_id: String,
    pub name: String,
    pub time: DateTime<Utc>,
    pub identifiers: Vec<EntityIdentifiers>,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correlation_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Rights::is_empty")]
    pub visibility: Rights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl From<&Event> for WireEvent {
    fn from(event: &Event) -> Self {
        Self {
            unique_id: event.unique_id().to_string(),
            name: event.name().to_string(),
            time: event.time(),
            identifiers: event.identifiers().to_vec(),
            origin: event.origin().to_string(),
            correlation_ids: event.correlation_ids().to_vec(),
            visibility: event.visibility().clone(),
            data: event.payload().cloned(),
            authentication: event.authentication().cloned(),
            remote_ip: event.remote_ip().map(str::to_string),
            user_agent: event.user_agent().map(str::to_string),
        }
    }
}

/// Opening message of a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRequest {
    /// Event name patterns. Empty means every event.
    pub names: Vec<String>,
    pub identifiers: Vec<EntityIdentifiers>,
    pub after: Option<DateTime<Utc>>,
    pub tail: Option<usize>,
}

impl StreamRequest {
    /// Whether the caller asked for past events.
    pub fn wants_history(&self) -> bool {
        self.after.is_some() || self.tail.is_some_and(|tail| tail > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindRelatedRequest {
    pub correlation_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindRelatedResponse {
    pub events: Vec<WireEvent>,
}

/// One server message on a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFrame {
    Warning(String),
    Result(WireEvent),
    Error(ApiError),
}
