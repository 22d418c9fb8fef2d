//! Plan lifecycle service: creation, status progression and plan-level
//! dependencies.

use super::{PlanServiceError, PlanServiceResult};
use crate::plan::{
    domain::{
        CycleVerdict, NewPlan, Plan, PlanDomainError, PlanGraph, PlanId, PlanStatus,
        check_candidate_edges,
    },
    ports::PlanRepository,
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Plan lifecycle orchestration service.
#[derive(Clone)]
pub struct PlanService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> PlanService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new plan service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    async fn find_plan_or_error(&self, plan_id: PlanId) -> PlanServiceResult<Plan> {
        self.repository
            .find_plan(plan_id)
            .await?
            .ok_or(PlanServiceError::PlanNotFound(plan_id))
    }

    /// Creates a draft plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Domain`] for a blank name or for
    /// plan-level blockers outside the project, and repository errors.
    pub async fn create_plan(&self, input: NewPlan) -> PlanServiceResult<Plan> {
        let plan = Plan::new(input, &*self.clock)?;
        if !plan.blocked_by_plan_ids().is_empty() {
            let siblings = self
                .repository
                .find_plans_by_project(plan.project_id())
                .await?;
            let graph = PlanGraph::from_plans(&siblings);
            validate_plan_edges(&graph, plan.id(), plan.blocked_by_plan_ids())?;
        }
        self.repository.create_plan(&plan).await?;
        debug!(plan = %plan.id(), project = %plan.project_id(), "created plan");
        Ok(plan)
    }

    /// Replaces the plan-level blockers of `plan_id`.
    ///
    /// Plans form their own dependency graph per project and obey the same
    /// rules as tasks: no self-edges, no cycles, blockers from the same
    /// project only.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Domain`] carrying
    /// [`PlanDomainError::SelfBlockedPlan`],
    /// [`PlanDomainError::UnknownPlanDependency`] or
    /// [`PlanDomainError::PlanCycle`], and repository errors.
    pub async fn set_plan_blocked_by(
        &self,
        plan_id: PlanId,
        blocked_by: Vec<PlanId>,
    ) -> PlanServiceResult<Plan> {
        let mut plan = self.find_plan_or_error(plan_id).await?;
        let siblings = self
            .repository
            .find_plans_by_project(plan.project_id())
            .await?;
        let graph = PlanGraph::from_plans(&siblings);
        let mut seen = HashSet::new();
        let candidate: Vec<PlanId> = blocked_by.into_iter().filter(|id| seen.insert(*id)).collect();

        validate_plan_edges(&graph, plan_id, &candidate)?;
        let now = self.clock.utc();
        self.repository
            .update_plan_blocked_by(plan_id, &candidate, now)
            .await?;
        plan.replace_blocked_by_plans(candidate, now);
        Ok(plan)
    }

    /// Moves a plan forward in its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::InvalidStatusTransition`] for backward or
    /// same-status moves, [`PlanServiceError::PlanNotFound`], and repository
    /// errors.
    pub async fn advance_status(
        &self,
        plan_id: PlanId,
        status: PlanStatus,
    ) -> PlanServiceResult<Plan> {
        let mut plan = self.find_plan_or_error(plan_id).await?;
        plan.advance_to(status, &*self.clock)?;
        self.repository
            .update_plan_status(
                plan_id,
                status,
                plan.published_at(),
                None,
                plan.updated_at(),
            )
            .await?;
        Ok(plan)
    }
}

fn validate_plan_edges(
    graph: &PlanGraph,
    plan_id: PlanId,
    candidate: &[PlanId],
) -> Result<(), PlanDomainError> {
    if candidate.contains(&plan_id) {
        return Err(PlanDomainError::SelfBlockedPlan(plan_id));
    }
    if let Some(unknown) = candidate.iter().find(|id| !graph.contains(**id)) {
        return Err(PlanDomainError::UnknownPlanDependency {
            plan: plan_id,
            dependency: *unknown,
        });
    }
    match check_candidate_edges(graph, plan_id, candidate) {
        CycleVerdict::Acyclic => Ok(()),
        CycleVerdict::SelfBlock(id) => Err(PlanDomainError::SelfBlockedPlan(id)),
        CycleVerdict::Cycle(path) => Err(PlanDomainError::PlanCycle(path)),
    }
}
