//! In-memory issue tracker adapter.
//!
//! Models issue creation without network access. Failures and latency can be
//! injected per issue title, which makes partial-publish flows reproducible.

use crate::plan::{
    domain::{ExternalIssueId, IssuePayload, MetaIssuePayload},
    ports::{IssueTracker, IssueTrackerError, IssueTrackerResult, TrackerCredential},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// In-memory tracker that numbers issues sequentially with a key prefix.
#[derive(Debug, Clone)]
pub struct InMemoryIssueTracker {
    key_prefix: String,
    state: Arc<RwLock<InMemoryTrackerState>>,
}

#[derive(Debug, Default)]
struct InMemoryTrackerState {
    next_number: u64,
    accepted_credential: Option<TrackerCredential>,
    failing_titles: HashMap<String, String>,
    delayed_titles: HashMap<String, Duration>,
    issues: Vec<(ExternalIssueId, IssuePayload)>,
    meta_issues: Vec<(ExternalIssueId, MetaIssuePayload)>,
    meta_issue_failure: Option<String>,
}

impl Default for InMemoryIssueTracker {
    fn default() -> Self {
        Self::new("PLAN")
    }
}

impl InMemoryIssueTracker {
    /// Creates an empty tracker whose issue keys start with `key_prefix`.
    #[must_use]
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            state: Arc::new(RwLock::new(InMemoryTrackerState::default())),
        }
    }

    fn write(&self) -> IssueTrackerResult<std::sync::RwLockWriteGuard<'_, InMemoryTrackerState>> {
        self.state
            .write()
            .map_err(|err| IssueTrackerError::transport(std::io::Error::other(err.to_string())))
    }

    fn read(&self) -> IssueTrackerResult<std::sync::RwLockReadGuard<'_, InMemoryTrackerState>> {
        self.state
            .read()
            .map_err(|err| IssueTrackerError::transport(std::io::Error::other(err.to_string())))
    }

    /// Accepts only `credential` from now on.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn require_credential(&self, credential: TrackerCredential) -> IssueTrackerResult<()> {
        self.write()?.accepted_credential = Some(credential);
        Ok(())
    }

    /// Rejects issues with the given title using `message`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_title(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> IssueTrackerResult<()> {
        self.write()?
            .failing_titles
            .insert(title.into(), message.into());
        Ok(())
    }

    /// Delays responses for issues with the given title.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn delay_title(&self, title: impl Into<String>, delay: Duration) -> IssueTrackerResult<()> {
        self.write()?.delayed_titles.insert(title.into(), delay);
        Ok(())
    }

    /// Makes meta-issue creation fail with `message`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_meta_issue(&self, message: impl Into<String>) -> IssueTrackerResult<()> {
        self.write()?.meta_issue_failure = Some(message.into());
        Ok(())
    }

    /// Returns created issues in creation order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn issues(&self) -> IssueTrackerResult<Vec<(ExternalIssueId, IssuePayload)>> {
        Ok(self.read()?.issues.clone())
    }

    /// Returns created meta-issues in creation order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn meta_issues(&self) -> IssueTrackerResult<Vec<(ExternalIssueId, MetaIssuePayload)>> {
        Ok(self.read()?.meta_issues.clone())
    }

    fn authorize(&self, credential: &TrackerCredential) -> IssueTrackerResult<()> {
        match &self.read()?.accepted_credential {
            Some(accepted) if accepted != credential => Err(IssueTrackerError::Unauthorized(
                "credential is not valid for this workspace".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    fn allocate_id(&self, state: &mut InMemoryTrackerState) -> IssueTrackerResult<ExternalIssueId> {
        state.next_number += 1;
        ExternalIssueId::new(format!("{}-{}", self.key_prefix, state.next_number))
            .map_err(IssueTrackerError::transport)
    }
}

#[async_trait]
impl IssueTracker for InMemoryIssueTracker {
    async fn create_issue(
        &self,
        credential: &TrackerCredential,
        payload: &IssuePayload,
    ) -> IssueTrackerResult<ExternalIssueId> {
        self.authorize(credential)?;
        let delay = self.read()?.delayed_titles.get(&payload.title).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.write()?;
        if let Some(message) = state.failing_titles.get(&payload.title) {
            return Err(IssueTrackerError::Rejected(message.clone()));
        }
        let issue_id = self.allocate_id(&mut state)?;
        state.issues.push((issue_id.clone(), payload.clone()));
        Ok(issue_id)
    }

    async fn create_meta_issue(
        &self,
        credential: &TrackerCredential,
        payload: &MetaIssuePayload,
    ) -> IssueTrackerResult<ExternalIssueId> {
        self.authorize(credential)?;
        let mut state = self.write()?;
        if let Some(message) = &state.meta_issue_failure {
            return Err(IssueTrackerError::Rejected(message.clone()));
        }
        let issue_id = self.allocate_id(&mut state)?;
        state.meta_issues.push((issue_id.clone(), payload.clone()));
        Ok(issue_id)
    }
}
