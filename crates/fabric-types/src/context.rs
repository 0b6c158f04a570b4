//! # Call Context
//!
//! The explicit per-call value that carries correlation ids, authentication,
//! client information and the cancellation scope. It is threaded through every
//! long-lived operation instead of living in task-local state.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// How the caller authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    /// Subject the rights are looked up for (user or client id).
    pub subject: String,
    /// Authentication type, e.g. `bearer`.
    #[serde(rename = "type")]
    pub auth_type: String,
    /// Token type, e.g. `access_token` or `api_key`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    /// Token identifier, never the secret itself.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_id: String,
}

impl Authentication {
    /// Bearer authentication for `subject`.
    #[must_use]
    pub fn bearer(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            auth_type: "bearer".to_string(),
            token_type: String::new(),
            token_id: String::new(),
        }
    }
}

/// Per-call context.
///
/// Cloning shares the cancellation scope; use [`CallContext::child`] for a
/// nested scope.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    correlation_ids: Vec<String>,
    authentication: Option<Authentication>,
    remote_ip: Option<String>,
    user_agent: Option<String>,
    cancel: CancellationToken,
}

impl CallContext {
    /// Fresh, unauthenticated, uncancelled context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_authentication(mut self, auth: Authentication) -> Self {
        self.authentication = Some(auth);
        self
    }

    /// Append correlation ids, keeping the list sorted and free of duplicates.
    #[must_use]
    pub fn with_correlation_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.correlation_ids.extend(ids.into_iter().map(Into::into));
        self.correlation_ids.sort();
        self.correlation_ids.dedup();
        self
    }

    #[must_use]
    pub fn with_remote_ip(mut self, remote_ip: impl Into<String>) -> Self {
        self.remote_ip = Some(remote_ip.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Bind the context to an existing cancellation scope.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Nested scope: cancelled with the parent, cancellable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            correlation_ids: self.correlation_ids.clone(),
            authentication: self.authentication.clone(),
            remote_ip: self.remote_ip.clone(),
            user_agent: self.user_agent.clone(),
            cancel: self.cancel.child_token(),
        }
    }

    #[must_use]
    pub fn correlation_ids(&self) -> &[String] {
        &self.correlation_ids
    }

    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    #[must_use]
    pub fn remote_ip(&self) -> Option<&str> {
        self.remote_ip.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// End the scope.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the scope has ended.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}
