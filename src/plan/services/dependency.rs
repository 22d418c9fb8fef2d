//! Task dependency guard.
//!
//! Every operation that changes `blocked_by` edges goes through this
//! service. Edges are validated against a fresh read of the plan's tasks
//! before anything is written; a rejected change writes nothing.

use super::{PlanServiceError, PlanServiceResult};
use crate::plan::{
    domain::{
        BatchTaskSpec, CycleVerdict, NewTask, PlanDomainError, PlanId, Task, TaskGraph, TaskId,
        check_candidate_edges,
    },
    ports::PlanRepository,
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Guards task creation, edge replacement and deletion.
#[derive(Clone)]
pub struct TaskDependencyService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskDependencyService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new dependency service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    async fn plan_tasks(&self, plan_id: PlanId) -> PlanServiceResult<Vec<Task>> {
        self.repository
            .find_plan(plan_id)
            .await?
            .ok_or(PlanServiceError::PlanNotFound(plan_id))?;
        Ok(self.repository.find_tasks_by_plan(plan_id).await?)
    }

    async fn find_task_or_error(&self, task_id: TaskId) -> PlanServiceResult<Task> {
        self.repository
            .find_task(task_id)
            .await?
            .ok_or(PlanServiceError::TaskNotFound(task_id))
    }

    /// Creates one task after validating its blockers.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::PlanNotFound`] for unknown plans,
    /// [`PlanServiceError::Domain`] when a blocker is unknown, and repository
    /// errors from persistence.
    pub async fn create_task(&self, plan_id: PlanId, input: NewTask) -> PlanServiceResult<Task> {
        let tasks = self.plan_tasks(plan_id).await?;
        let graph = TaskGraph::from_tasks(&tasks);
        let blocked_by = dedup(input.blocked_by.iter().copied());
        let task = Task::new(plan_id, NewTask { blocked_by, ..input }, &*self.clock);
        validate_edges(&graph, task.id(), task.blocked_by())?;
        self.repository.create_task(&task).await?;
        debug!(task = %task.id(), plan = %plan_id, "created task");
        Ok(task)
    }

    /// Reports whether `task_id` may be blocked by exactly `candidate`
    /// without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::TaskNotFound`] or repository errors;
    /// a cycle is reported through the verdict, not as an error.
    pub async fn check_blocked_by(
        &self,
        task_id: TaskId,
        candidate: &[TaskId],
    ) -> PlanServiceResult<CycleVerdict<TaskId>> {
        let task = self.find_task_or_error(task_id).await?;
        let tasks = self.repository.find_tasks_by_plan(task.plan_id()).await?;
        let graph = TaskGraph::from_tasks(&tasks);
        Ok(check_candidate_edges(&graph, task_id, candidate))
    }

    /// Replaces the blockers of `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Domain`] carrying
    /// [`PlanDomainError::SelfBlockedTask`], [`PlanDomainError::UnknownDependency`]
    /// or [`PlanDomainError::TaskCycle`] when the edges are rejected; the
    /// stored task is left unchanged in that case.
    pub async fn set_blocked_by(
        &self,
        task_id: TaskId,
        blocked_by: Vec<TaskId>,
    ) -> PlanServiceResult<Task> {
        let mut task = self.find_task_or_error(task_id).await?;
        let tasks = self.repository.find_tasks_by_plan(task.plan_id()).await?;
        let graph = TaskGraph::from_tasks(&tasks);
        let candidate = dedup(blocked_by);

        if let Err(err) = validate_edges(&graph, task_id, &candidate) {
            debug!(task = %task_id, error = %err, "rejected blocked_by change");
            return Err(err.into());
        }

        let now = self.clock.utc();
        self.repository
            .update_task_blocked_by(task_id, &candidate, now)
            .await?;
        task.replace_blocked_by(candidate, now);
        Ok(task)
    }

    /// Adds one blocker to `task_id`. Adding an existing blocker is a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_blocked_by`].
    pub async fn add_dependency(
        &self,
        task_id: TaskId,
        blocker: TaskId,
    ) -> PlanServiceResult<Task> {
        let task = self.find_task_or_error(task_id).await?;
        if task.blocked_by().contains(&blocker) {
            return Ok(task);
        }
        let mut blocked_by = task.blocked_by().to_vec();
        blocked_by.push(blocker);
        self.set_blocked_by(task_id, blocked_by).await
    }

    /// Removes one blocker from `task_id`. Removing an absent blocker is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::TaskNotFound`] or repository errors.
    pub async fn remove_dependency(
        &self,
        task_id: TaskId,
        blocker: TaskId,
    ) -> PlanServiceResult<Task> {
        let task = self.find_task_or_error(task_id).await?;
        if !task.blocked_by().contains(&blocker) {
            return Ok(task);
        }
        let blocked_by = task
            .blocked_by()
            .iter()
            .copied()
            .filter(|id| *id != blocker)
            .collect();
        self.set_blocked_by(task_id, blocked_by).await
    }

    /// Deletes a task and strips it from every sibling's blockers in one
    /// atomic repository write.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::TaskNotFound`] for unknown tasks or the
    /// repository error that aborted the whole delete.
    pub async fn delete_task(&self, task_id: TaskId) -> PlanServiceResult<()> {
        self.find_task_or_error(task_id).await?;
        self.repository
            .delete_task_cascading(task_id, self.clock.utc())
            .await?;
        debug!(task = %task_id, "deleted task with cascade");
        Ok(())
    }

    /// Creates a batch of tasks whose blockers reference batch positions.
    ///
    /// Identifiers are allocated for the whole batch first, indices are then
    /// translated to identifiers in one pass, and the combined graph is
    /// validated before the batch is written in a single repository call.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::BatchIndexOutOfRange`],
    /// [`PlanDomainError::SelfBlockedBatchEntry`] or
    /// [`PlanDomainError::TaskCycle`] before any write, and repository
    /// errors from the batch write.
    pub async fn create_batch(
        &self,
        plan_id: PlanId,
        specs: Vec<BatchTaskSpec>,
    ) -> PlanServiceResult<Vec<Task>> {
        check_batch_indices(&specs)?;
        let existing = self.plan_tasks(plan_id).await?;
        let next_sort_order = existing
            .iter()
            .map(Task::sort_order)
            .max()
            .map_or(0, |max| max.saturating_add(1));

        let (mut created, edges): (Vec<Task>, Vec<Vec<usize>>) = specs
            .into_iter()
            .enumerate()
            .map(|(position, spec)| {
                let sort_order = spec.sort_order.unwrap_or_else(|| {
                    i32::try_from(position)
                        .map_or(i32::MAX, |offset| next_sort_order.saturating_add(offset))
                });
                let task = Task::new(
                    plan_id,
                    NewTask::new(spec.content, sort_order),
                    &*self.clock,
                );
                (task, spec.blocked_by_indices)
            })
            .unzip();

        let ids: Vec<TaskId> = created.iter().map(Task::id).collect();
        for (task, indices) in created.iter_mut().zip(edges) {
            let blocked_by = dedup(indices.into_iter().filter_map(|index| ids.get(index).copied()));
            let created_at = task.created_at();
            task.replace_blocked_by(blocked_by, created_at);
        }

        let graph = TaskGraph::from_tasks(existing.iter().chain(created.iter()));
        for task in &created {
            reject_invalid_verdict(check_candidate_edges(&graph, task.id(), task.blocked_by()))?;
        }

        self.repository.create_tasks(&created).await?;
        debug!(plan = %plan_id, count = created.len(), "created task batch");
        Ok(created)
    }

    /// Returns the plan's tasks ordered so that every task follows its
    /// blockers, breaking ties by sort order.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::PlanNotFound`], repository errors, or
    /// [`PlanServiceError::InconsistentGraph`] if stored edges are cyclic.
    pub async fn execution_order(&self, plan_id: PlanId) -> PlanServiceResult<Vec<Task>> {
        let tasks = self.plan_tasks(plan_id).await?;
        let graph = TaskGraph::from_tasks(&tasks);
        let position = |id: TaskId| {
            tasks
                .iter()
                .position(|task| task.id() == id)
                .unwrap_or(usize::MAX)
        };
        let order = graph
            .topological_order(position)
            .map_err(PlanServiceError::InconsistentGraph)?;
        Ok(order
            .into_iter()
            .filter_map(|id| tasks.iter().find(|task| task.id() == id).cloned())
            .collect())
    }
}

/// Runs the self-block precondition, the same-plan check and the cycle
/// detector, in that order.
fn validate_edges(
    graph: &TaskGraph,
    task_id: TaskId,
    candidate: &[TaskId],
) -> Result<(), PlanDomainError> {
    if candidate.contains(&task_id) {
        return Err(PlanDomainError::SelfBlockedTask(task_id));
    }
    if let Some(unknown) = candidate.iter().find(|id| !graph.contains(**id)) {
        return Err(PlanDomainError::UnknownDependency {
            task: task_id,
            dependency: *unknown,
        });
    }
    reject_invalid_verdict(check_candidate_edges(graph, task_id, candidate))
}

fn reject_invalid_verdict(verdict: CycleVerdict<TaskId>) -> Result<(), PlanDomainError> {
    match verdict {
        CycleVerdict::Acyclic => Ok(()),
        CycleVerdict::SelfBlock(task_id) => Err(PlanDomainError::SelfBlockedTask(task_id)),
        CycleVerdict::Cycle(path) => Err(PlanDomainError::TaskCycle(path)),
    }
}

fn check_batch_indices(specs: &[BatchTaskSpec]) -> Result<(), PlanDomainError> {
    let len = specs.len();
    for (index, spec) in specs.iter().enumerate() {
        for reference in &spec.blocked_by_indices {
            if *reference == index {
                return Err(PlanDomainError::SelfBlockedBatchEntry(index));
            }
            if *reference >= len {
                return Err(PlanDomainError::BatchIndexOutOfRange {
                    index,
                    reference: *reference,
                    len,
                });
            }
        }
    }
    Ok(())
}

fn dedup(ids: impl IntoIterator<Item = TaskId>) -> Vec<TaskId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
