//! Plan cloning.
//!
//! A clone is a fresh, unpublished, dependency-free copy. Task blockers are
//! dropped rather than remapped: old identifiers mean nothing in the new
//! plan.

use super::{PlanServiceError, PlanServiceResult};
use crate::plan::{
    domain::{Plan, PlanId, Task},
    ports::PlanRepository,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Plan and tasks produced by [`PlanCloneService::clone_plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClonedPlan {
    /// The new draft plan.
    pub plan: Plan,
    /// Copies of the source tasks, in source sort order.
    pub tasks: Vec<Task>,
}

/// Copies plans into structurally independent drafts.
#[derive(Clone)]
pub struct PlanCloneService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> PlanCloneService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new clone service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Clones `plan_id` into a new draft plan in the same project.
    ///
    /// The source plan is only read. If the task copies cannot be written,
    /// the new plan is removed again.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::PlanNotFound`] or repository errors.
    pub async fn clone_plan(&self, plan_id: PlanId) -> PlanServiceResult<ClonedPlan> {
        let source = self
            .repository
            .find_plan(plan_id)
            .await?
            .ok_or(PlanServiceError::PlanNotFound(plan_id))?;
        let source_tasks = self.repository.find_tasks_by_plan(plan_id).await?;

        let plan = source.duplicate(&*self.clock);
        let tasks: Vec<Task> = source_tasks
            .iter()
            .map(|task| task.duplicate_into(plan.id(), &*self.clock))
            .collect();

        self.repository.create_plan(&plan).await?;
        if let Err(err) = self.repository.create_tasks(&tasks).await {
            if let Err(cleanup) = self.repository.delete_plan(plan.id()).await {
                warn!(plan = %plan.id(), error = %cleanup, "failed to remove partial clone");
            }
            return Err(err.into());
        }

        debug!(source = %plan_id, clone = %plan.id(), tasks = tasks.len(), "cloned plan");
        Ok(ClonedPlan { plan, tasks })
    }
}
