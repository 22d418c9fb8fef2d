//! Publish pipeline: exports a plan's tasks to the external tracker.
//!
//! The run is best-effort and not rolled back. Each task gets one issue
//! creation attempt in sort order; failures are collected instead of
//! aborting. The meta-issue follows all task attempts, then issue ids are
//! written back to the tasks and the plan is marked published whether or
//! not any issue was created.

use super::{
    PublishConfig, PublishError, PublishResult,
    render::{RenderError, issue_payload, meta_issue_payload},
};
use crate::plan::{
    domain::{
        CreatedIssue, ExternalIssueId, ExternalProjectId, Plan, PlanDomainError, PlanId,
        PlanStatus, PublishFailure, PublishOutcome, Task,
    },
    ports::{
        IssueTracker, IssueTrackerError, IssueTrackerResult, PlanRepository, PlanRepositoryError,
        TrackerCredential,
    },
};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Failure of one best-effort step, recorded in the outcome instead of
/// aborting the run.
#[derive(Debug, Error)]
enum PublishStepError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Tracker(#[from] IssueTrackerError),
    #[error(transparent)]
    Domain(#[from] PlanDomainError),
    #[error(transparent)]
    Repository(#[from] PlanRepositoryError),
}

/// Request to publish one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    plan_id: PlanId,
    credential: Option<TrackerCredential>,
    create_meta_issue: Option<bool>,
    external_project_id: Option<ExternalProjectId>,
    force: bool,
}

impl PublishRequest {
    /// Creates a request for `plan_id` with the caller's tracker credential.
    #[must_use]
    pub const fn new(plan_id: PlanId, credential: Option<TrackerCredential>) -> Self {
        Self {
            plan_id,
            credential,
            create_meta_issue: None,
            external_project_id: None,
            force: false,
        }
    }

    /// Overrides the configured meta-issue default.
    #[must_use]
    pub fn with_meta_issue(mut self, create: bool) -> Self {
        self.create_meta_issue = Some(create);
        self
    }

    /// Records the tracker project the issues belong to.
    #[must_use]
    pub fn with_external_project(mut self, project_id: ExternalProjectId) -> Self {
        self.external_project_id = Some(project_id);
        self
    }

    /// Allows publishing a plan that is already published. Issues are
    /// created again; the tracker does not deduplicate them.
    #[must_use]
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Publish pipeline service.
#[derive(Clone)]
pub struct PublishService<R, T, C>
where
    R: PlanRepository,
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    tracker: Arc<T>,
    clock: Arc<C>,
    config: PublishConfig,
}

impl<R, T, C> PublishService<R, T, C>
where
    R: PlanRepository,
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates a new publish service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        tracker: Arc<T>,
        clock: Arc<C>,
        config: PublishConfig,
    ) -> Self {
        Self {
            repository,
            tracker,
            clock,
            config,
        }
    }

    /// Publishes a plan.
    ///
    /// Always returns a structured outcome once the preconditions hold, even
    /// when some or all tracker calls fail. The plan is marked published in
    /// either case; `success` reports whether any issue was created.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when a precondition fails (missing plan,
    /// empty plan, missing credential, already published) or when reading
    /// the plan fails. No tracker call is made in those cases.
    pub async fn publish(&self, request: PublishRequest) -> PublishResult<PublishOutcome> {
        let PublishRequest {
            plan_id,
            credential,
            create_meta_issue,
            external_project_id,
            force,
        } = request;

        let mut plan = self
            .repository
            .find_plan(plan_id)
            .await?
            .ok_or(PublishError::PlanNotFound(plan_id))?;
        ensure_publishable(&plan, force)?;

        let mut tasks = self.repository.find_tasks_by_plan(plan_id).await?;
        if tasks.is_empty() {
            return Err(PublishError::EmptyPlan(plan_id));
        }
        let credential = credential.ok_or(PublishError::MissingCredential)?;
        tasks.sort_by_key(Task::sort_order);

        info!(plan = %plan_id, tasks = tasks.len(), "publishing plan");
        let (created, mut errors) = self.create_task_issues(&credential, &tasks).await;

        let mut meta_issue_id = None;
        if create_meta_issue.unwrap_or(self.config.create_meta_issue) && !created.is_empty() {
            match self
                .create_meta_issue(&credential, &plan, &tasks, &created, errors.len())
                .await
            {
                Ok(issue_id) => meta_issue_id = Some(issue_id),
                Err(err) => {
                    warn!(plan = %plan_id, error = %err, "meta-issue creation failed");
                    errors.push(PublishFailure {
                        task_id: None,
                        message: format!("meta-issue: {err}"),
                    });
                }
            }
        }

        self.write_back(&created).await;

        if let Err(err) = self.mark_published(&mut plan, external_project_id).await {
            warn!(plan = %plan_id, error = %err, "failed to mark plan published");
            errors.push(PublishFailure {
                task_id: None,
                message: format!("plan status: {err}"),
            });
        }

        let outcome = PublishOutcome::new(created, meta_issue_id, errors, tasks.len());
        info!(plan = %plan_id, summary = %outcome.summary(), "publish finished");
        Ok(outcome)
    }

    async fn create_task_issues(
        &self,
        credential: &TrackerCredential,
        tasks: &[Task],
    ) -> (Vec<CreatedIssue>, Vec<PublishFailure>) {
        let mut created = Vec::with_capacity(tasks.len());
        let mut errors = Vec::new();

        for task in tasks {
            match self.create_task_issue(credential, task).await {
                Ok(external_issue_id) => created.push(CreatedIssue {
                    task_id: task.id(),
                    external_issue_id,
                }),
                Err(err) => {
                    warn!(task = %task.id(), error = %err, "issue creation failed");
                    errors.push(PublishFailure {
                        task_id: Some(task.id()),
                        message: err.to_string(),
                    });
                }
            }
        }
        (created, errors)
    }

    async fn create_task_issue(
        &self,
        credential: &TrackerCredential,
        task: &Task,
    ) -> Result<ExternalIssueId, PublishStepError> {
        let payload = issue_payload(task)?;
        let issue_id = with_timeout(
            self.config.request_timeout,
            self.tracker.create_issue(credential, &payload),
        )
        .await?;
        Ok(issue_id)
    }

    async fn create_meta_issue(
        &self,
        credential: &TrackerCredential,
        plan: &Plan,
        tasks: &[Task],
        created: &[CreatedIssue],
        failed: usize,
    ) -> Result<ExternalIssueId, PublishStepError> {
        let payload = meta_issue_payload(
            plan,
            tasks,
            created,
            failed,
            &self.config.meta_issue_title_prefix,
        )?;
        let issue_id = with_timeout(
            self.config.request_timeout,
            self.tracker.create_meta_issue(credential, &payload),
        )
        .await?;
        Ok(issue_id)
    }

    /// Links created issues to their tasks. Failures are logged only: the
    /// tracker stays the source of truth for what was created.
    async fn write_back(&self, created: &[CreatedIssue]) {
        let linked_at = self.clock.utc();
        for issue in created {
            if let Err(err) = self
                .repository
                .set_task_external_issue(issue.task_id, &issue.external_issue_id, linked_at)
                .await
            {
                warn!(
                    task = %issue.task_id,
                    issue = %issue.external_issue_id,
                    error = %err,
                    "failed to link task to created issue"
                );
            }
        }
    }

    async fn mark_published(
        &self,
        plan: &mut Plan,
        external_project_id: Option<ExternalProjectId>,
    ) -> Result<(), PublishStepError> {
        plan.mark_published(external_project_id, &*self.clock)?;
        self.repository
            .update_plan_status(
                plan.id(),
                plan.status(),
                plan.published_at(),
                plan.external_project_id().cloned(),
                plan.updated_at(),
            )
            .await?;
        Ok(())
    }
}

fn ensure_publishable(plan: &Plan, force: bool) -> PublishResult<()> {
    match plan.status() {
        PlanStatus::Archived => Err(PublishError::AlreadyPublished {
            plan: plan.id(),
            status: plan.status(),
        }),
        PlanStatus::Published if !force => Err(PublishError::AlreadyPublished {
            plan: plan.id(),
            status: plan.status(),
        }),
        _ => Ok(()),
    }
}

async fn with_timeout<F>(limit: Duration, call: F) -> IssueTrackerResult<ExternalIssueId>
where
    F: Future<Output = IssueTrackerResult<ExternalIssueId>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(IssueTrackerError::Timeout(limit)))
}
