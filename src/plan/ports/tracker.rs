//! External issue tracker port.

use crate::plan::domain::{ExternalIssueId, IssuePayload, MetaIssuePayload};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for tracker operations.
pub type IssueTrackerResult<T> = Result<T, IssueTrackerError>;

/// API credential for the external tracker, supplied per publish call.
#[derive(Clone, PartialEq, Eq)]
pub struct TrackerCredential(String);

impl TrackerCredential {
    /// Wraps a credential, returning `None` when it is blank.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let raw = value.into();
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    /// Exposes the secret for adapters that send it over the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TrackerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrackerCredential(<redacted>)")
    }
}

/// Issue creation contract of the external tracker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Creates one issue and returns its tracker identifier.
    async fn create_issue(
        &self,
        credential: &TrackerCredential,
        payload: &IssuePayload,
    ) -> IssueTrackerResult<ExternalIssueId>;

    /// Creates the aggregating meta-issue and returns its identifier.
    async fn create_meta_issue(
        &self,
        credential: &TrackerCredential,
        payload: &MetaIssuePayload,
    ) -> IssueTrackerResult<ExternalIssueId>;
}

/// Errors returned by tracker adapters.
#[derive(Debug, Clone, Error)]
pub enum IssueTrackerError {
    /// The credential was refused.
    #[error("tracker rejected credential: {0}")]
    Unauthorized(String),

    /// The payload was refused.
    #[error("tracker rejected issue: {0}")]
    Rejected(String),

    /// The call did not complete in time.
    #[error("tracker call timed out after {0:?}")]
    Timeout(Duration),

    /// Network or protocol failure.
    #[error("tracker transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl IssueTrackerError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
