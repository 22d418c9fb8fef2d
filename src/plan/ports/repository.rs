//! Repository port for plan and task persistence.

use crate::plan::domain::{
    ExternalIssueId, ExternalProjectId, Plan, PlanId, PlanStatus, ProjectId, Task, TaskId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for plan repository operations.
pub type PlanRepositoryResult<T> = Result<T, PlanRepositoryError>;

/// Plan and task persistence contract.
///
/// Every multi-record write is atomic: it either applies completely or not
/// at all.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Stores a new plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::DuplicatePlan`] when the identifier is
    /// already taken.
    async fn create_plan(&self, plan: &Plan) -> PlanRepositoryResult<()>;

    /// Finds a plan by identifier.
    async fn find_plan(&self, id: PlanId) -> PlanRepositoryResult<Option<Plan>>;

    /// Returns every plan of a project ordered by sort order.
    async fn find_plans_by_project(&self, project_id: ProjectId) -> PlanRepositoryResult<Vec<Plan>>;

    /// Records a status change together with publication data, stamping the
    /// plan with `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::PlanNotFound`] when the plan does not
    /// exist.
    async fn update_plan_status(
        &self,
        id: PlanId,
        status: PlanStatus,
        published_at: Option<DateTime<Utc>>,
        external_project_id: Option<ExternalProjectId>,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()>;

    /// Replaces a plan's plan-level blockers.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::PlanNotFound`] when the plan does not
    /// exist.
    async fn update_plan_blocked_by(
        &self,
        id: PlanId,
        blocked_by: &[PlanId],
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()>;

    /// Deletes a plan together with all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::PlanNotFound`] when the plan does not
    /// exist.
    async fn delete_plan(&self, id: PlanId) -> PlanRepositoryResult<()>;

    /// Returns every task of a plan ordered by sort order.
    async fn find_tasks_by_plan(&self, plan_id: PlanId) -> PlanRepositoryResult<Vec<Task>>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> PlanRepositoryResult<Option<Task>>;

    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::PlanNotFound`] when the owning plan is
    /// missing or [`PlanRepositoryError::DuplicateTask`] when the identifier
    /// is already taken.
    async fn create_task(&self, task: &Task) -> PlanRepositoryResult<()>;

    /// Stores a batch of new tasks in one atomic write.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_task`]; on error no task of the batch persists.
    async fn create_tasks(&self, tasks: &[Task]) -> PlanRepositoryResult<()>;

    /// Replaces a task's blockers.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::TaskNotFound`] when the task does not
    /// exist.
    async fn update_task_blocked_by(
        &self,
        id: TaskId,
        blocked_by: &[TaskId],
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()>;

    /// Records the external issue created for a task.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::TaskNotFound`] when the task does not
    /// exist.
    async fn set_task_external_issue(
        &self,
        id: TaskId,
        issue_id: &ExternalIssueId,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()>;

    /// Deletes a task and removes its id from every other task's blockers in
    /// one atomic write. Affected dependents are stamped with `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRepositoryError::TaskNotFound`] when the task does not
    /// exist.
    async fn delete_task_cascading(
        &self,
        id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()>;
}

/// Errors returned by plan repository implementations.
#[derive(Debug, Clone, Error)]
pub enum PlanRepositoryError {
    /// A plan with the same identifier already exists.
    #[error("duplicate plan identifier: {0}")]
    DuplicatePlan(PlanId),

    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The plan was not found.
    #[error("plan not found: {0}")]
    PlanNotFound(PlanId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Storage is unavailable or rejected the operation.
    #[error("storage unavailable: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl PlanRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
