//! Error types for planning domain validation and parsing.

use super::{CyclePath, PlanId, TaskId};
use thiserror::Error;

/// Errors returned while validating plan and task values or dependency edges.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTaskTitle,

    /// The plan name is empty after trimming.
    #[error("plan name must not be empty")]
    EmptyPlanName,

    /// An external identifier is empty after trimming.
    #[error("external {0} identifier must not be empty")]
    EmptyExternalId(&'static str),

    /// The priority lies outside the supported range.
    #[error("invalid priority {0}, expected a value between 0 and 4")]
    InvalidPriority(u8),

    /// The estimate is not a positive, finite number of hours.
    #[error("invalid estimate {0}, expected a positive number of hours")]
    InvalidEstimate(String),

    /// A task lists itself as a blocker.
    #[error("task {0} cannot be blocked by itself")]
    SelfBlockedTask(TaskId),

    /// A plan lists itself as a blocker.
    #[error("plan {0} cannot be blocked by itself")]
    SelfBlockedPlan(PlanId),

    /// The proposed task edges would close a dependency cycle.
    #[error("circular task dependency: {0}")]
    TaskCycle(CyclePath<TaskId>),

    /// The proposed plan edges would close a dependency cycle.
    #[error("circular plan dependency: {0}")]
    PlanCycle(CyclePath<PlanId>),

    /// A blocker does not exist in the same plan.
    #[error("task {task} cannot depend on {dependency}: not a task in the same plan")]
    UnknownDependency {
        /// Task whose edges were being changed.
        task: TaskId,
        /// Referenced blocker.
        dependency: TaskId,
    },

    /// A plan-level blocker does not exist in the same project.
    #[error("plan {plan} cannot depend on {dependency}: not a plan in the same project")]
    UnknownPlanDependency {
        /// Plan whose edges were being changed.
        plan: PlanId,
        /// Referenced blocker.
        dependency: PlanId,
    },

    /// A batch entry references an index outside the batch.
    #[error("batch entry {index} references index {reference}, but the batch has {len} entries")]
    BatchIndexOutOfRange {
        /// Position of the offending entry.
        index: usize,
        /// Out-of-range reference.
        reference: usize,
        /// Batch length.
        len: usize,
    },

    /// A batch entry references itself.
    #[error("batch entry {0} cannot be blocked by itself")]
    SelfBlockedBatchEntry(usize),

    /// The requested status change moves backwards or stays in place.
    #[error("invalid plan status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: super::PlanStatus,
        /// Requested status.
        to: super::PlanStatus,
    },
}

/// Error returned while parsing plan statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown plan status: {0}")]
pub struct ParsePlanStatusError(pub String);
