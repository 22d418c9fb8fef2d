//! Domain model for plans, tasks and their dependency graphs.
//!
//! Everything here is pure: graph algorithms, aggregates and tracker payload
//! types. Persistence and tracker access live behind the ports.

mod cycle;
mod error;
mod graph;
mod ids;
mod plan;
mod task;
mod tracker;

pub use cycle::{CyclePath, CycleVerdict, check_candidate_edges};
pub use error::{ParsePlanStatusError, PlanDomainError};
pub use graph::DependencyGraph;
pub use ids::{ExternalIssueId, ExternalProjectId, PlanId, ProjectId, SessionId, TaskId};
pub use plan::{CLONE_NAME_SUFFIX, NewPlan, PersistedPlanData, Plan, PlanStatus};
pub use task::{
    BatchTaskSpec, CanvasPosition, NewTask, PersistedTaskData, Task, TaskContent, TaskEstimate,
    TaskPriority,
};
pub use tracker::{
    CreatedIssue, IssuePayload, MetaIssuePayload, PublishFailure, PublishOutcome, TrackerPriority,
};

/// Dependency graph over the tasks of one plan.
pub type TaskGraph = DependencyGraph<TaskId>;

/// Dependency graph over the plans of one project.
pub type PlanGraph = DependencyGraph<PlanId>;

impl TaskGraph {
    /// Builds the graph of `tasks`, which should all belong to one plan.
    #[must_use]
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        Self::from_edges(
            tasks
                .into_iter()
                .map(|task| (task.id(), task.blocked_by().to_vec())),
        )
    }
}

impl PlanGraph {
    /// Builds the plan-level graph of `plans`, which should share a project.
    #[must_use]
    pub fn from_plans<'a>(plans: impl IntoIterator<Item = &'a Plan>) -> Self {
        Self::from_edges(
            plans
                .into_iter()
                .map(|plan| (plan.id(), plan.blocked_by_plan_ids().to_vec())),
        )
    }
}
