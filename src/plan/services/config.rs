//! Configuration for the publish pipeline.

use std::time::Duration;

/// Publish pipeline settings.
///
/// # Examples
///
/// ```
/// use planweave::plan::services::PublishConfig;
/// use std::time::Duration;
///
/// let config = PublishConfig::default();
/// assert!(config.create_meta_issue);
///
/// let quick = PublishConfig::default().with_request_timeout(Duration::from_secs(5));
/// assert_eq!(quick.request_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Upper bound for each tracker call.
    pub request_timeout: Duration,
    /// Whether a meta-issue is created unless the request says otherwise.
    pub create_meta_issue: bool,
    /// Prefix prepended to the plan name to form the meta-issue title.
    pub meta_issue_title_prefix: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            create_meta_issue: true,
            meta_issue_title_prefix: "Plan: ".to_owned(),
        }
    }
}

impl PublishConfig {
    /// Creates a configuration that never creates meta-issues by default.
    #[must_use]
    pub fn without_meta_issue() -> Self {
        Self {
            create_meta_issue: false,
            ..Default::default()
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
