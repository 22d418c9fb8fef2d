//! Service-level error types.

use crate::plan::{
    domain::{PlanDomainError, PlanId, PlanStatus, TaskId},
    ports::PlanRepositoryError,
};
use thiserror::Error;

/// Errors returned by plan, task dependency and clone services.
#[derive(Debug, Error)]
pub enum PlanServiceError {
    /// Validation failed; nothing was written.
    #[error(transparent)]
    Domain(#[from] PlanDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] PlanRepositoryError),
    /// No plan exists with the given identifier.
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    /// Stored edges already form a cycle through the listed tasks.
    #[error("stored dependency graph is cyclic through {0:?}")]
    InconsistentGraph(Vec<TaskId>),
}

/// Result type for plan service operations.
pub type PlanServiceResult<T> = Result<T, PlanServiceError>;

/// Precondition and storage errors that abort a publish before any tracker
/// call is made.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] PlanRepositoryError),
    /// No plan exists with the given identifier.
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),
    /// The plan has no tasks to publish.
    #[error("plan {0} has no tasks to publish")]
    EmptyPlan(PlanId),
    /// The caller supplied no tracker credential.
    #[error("no issue tracker credential configured")]
    MissingCredential,
    /// The plan was already published or archived.
    #[error("plan {plan} is {status} and cannot be published again")]
    AlreadyPublished {
        /// Plan identifier.
        plan: PlanId,
        /// Current status.
        status: PlanStatus,
    },
}

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;
