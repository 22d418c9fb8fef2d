//! In-memory repository for plans and tasks.
//!
//! Forward edges live on each task; a reverse index maps every task to the
//! tasks that list it as a blocker, so cascade cleanup on delete touches
//! only the affected tasks. All writes happen under one lock, which makes
//! every multi-record write atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::plan::{
    domain::{
        ExternalIssueId, ExternalProjectId, PersistedPlanData, Plan, PlanId, PlanStatus,
        ProjectId, Task, TaskId,
    },
    ports::{PlanRepository, PlanRepositoryError, PlanRepositoryResult},
};

/// Thread-safe in-memory plan repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanRepository {
    state: Arc<RwLock<InMemoryPlanState>>,
}

#[derive(Debug, Default)]
struct InMemoryPlanState {
    plans: HashMap<PlanId, Plan>,
    tasks: HashMap<TaskId, Task>,
    plan_tasks: HashMap<PlanId, HashSet<TaskId>>,
    dependents: HashMap<TaskId, HashSet<TaskId>>,
}

impl InMemoryPlanRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PlanRepositoryResult<RwLockReadGuard<'_, InMemoryPlanState>> {
        self.state.read().map_err(|err| {
            PlanRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> PlanRepositoryResult<RwLockWriteGuard<'_, InMemoryPlanState>> {
        self.state.write().map_err(|err| {
            PlanRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

impl InMemoryPlanState {
    fn index_edges(&mut self, task_id: TaskId, blocked_by: &[TaskId]) {
        for blocker in blocked_by {
            self.dependents.entry(*blocker).or_default().insert(task_id);
        }
    }

    fn unindex_edges(&mut self, task_id: TaskId, blocked_by: &[TaskId]) {
        for blocker in blocked_by {
            if let Some(dependents) = self.dependents.get_mut(blocker) {
                dependents.remove(&task_id);
                if dependents.is_empty() {
                    self.dependents.remove(blocker);
                }
            }
        }
    }

    fn check_insertable(&self, task: &Task) -> PlanRepositoryResult<()> {
        if !self.plans.contains_key(&task.plan_id()) {
            return Err(PlanRepositoryError::PlanNotFound(task.plan_id()));
        }
        if self.tasks.contains_key(&task.id()) {
            return Err(PlanRepositoryError::DuplicateTask(task.id()));
        }
        Ok(())
    }

    fn insert_task(&mut self, task: &Task) {
        self.index_edges(task.id(), task.blocked_by());
        self.plan_tasks
            .entry(task.plan_id())
            .or_default()
            .insert(task.id());
        self.tasks.insert(task.id(), task.clone());
    }

    fn task_mut(&mut self, id: TaskId) -> PlanRepositoryResult<&mut Task> {
        self.tasks
            .get_mut(&id)
            .ok_or(PlanRepositoryError::TaskNotFound(id))
    }

    fn remove_task(&mut self, id: TaskId, updated_at: DateTime<Utc>) -> PlanRepositoryResult<()> {
        let removed = self
            .tasks
            .remove(&id)
            .ok_or(PlanRepositoryError::TaskNotFound(id))?;
        self.unindex_edges(id, removed.blocked_by());

        for dependent_id in self.dependents.remove(&id).unwrap_or_default() {
            if let Some(dependent) = self.tasks.get_mut(&dependent_id) {
                dependent.remove_blocker(id, updated_at);
            }
        }

        if let Some(siblings) = self.plan_tasks.get_mut(&removed.plan_id()) {
            siblings.remove(&id);
        }
        Ok(())
    }
}

fn sorted_tasks<'a>(tasks: impl Iterator<Item = &'a Task>) -> Vec<Task> {
    let mut found: Vec<Task> = tasks.cloned().collect();
    found.sort_by(|left, right| {
        left.sort_order()
            .cmp(&right.sort_order())
            .then_with(|| left.created_at().cmp(&right.created_at()))
            .then_with(|| left.id().cmp(&right.id()))
    });
    found
}

fn rebuild_plan(
    plan: &Plan,
    updated_at: DateTime<Utc>,
    change: impl FnOnce(&mut PersistedPlanData),
) -> Plan {
    let mut data = PersistedPlanData {
        id: plan.id(),
        project_id: plan.project_id(),
        name: plan.name().to_owned(),
        description: plan.description().to_owned(),
        version: plan.version(),
        status: plan.status(),
        sort_order: plan.sort_order(),
        blocked_by_plan_ids: plan.blocked_by_plan_ids().to_vec(),
        master_plan_id: plan.master_plan_id(),
        session_id: plan.session_id(),
        summary: plan.summary().map(str::to_owned),
        external_project_id: plan.external_project_id().cloned(),
        published_at: plan.published_at(),
        created_at: plan.created_at(),
        updated_at,
    };
    change(&mut data);
    Plan::from_persisted(data)
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn create_plan(&self, plan: &Plan) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        if state.plans.contains_key(&plan.id()) {
            return Err(PlanRepositoryError::DuplicatePlan(plan.id()));
        }
        state.plans.insert(plan.id(), plan.clone());
        state.plan_tasks.entry(plan.id()).or_default();
        Ok(())
    }

    async fn find_plan(&self, id: PlanId) -> PlanRepositoryResult<Option<Plan>> {
        let state = self.read()?;
        Ok(state.plans.get(&id).cloned())
    }

    async fn find_plans_by_project(&self, project_id: ProjectId) -> PlanRepositoryResult<Vec<Plan>> {
        let state = self.read()?;
        let mut plans: Vec<Plan> = state
            .plans
            .values()
            .filter(|plan| plan.project_id() == project_id)
            .cloned()
            .collect();
        plans.sort_by(|left, right| {
            left.sort_order()
                .cmp(&right.sort_order())
                .then_with(|| left.created_at().cmp(&right.created_at()))
        });
        Ok(plans)
    }

    async fn update_plan_status(
        &self,
        id: PlanId,
        status: PlanStatus,
        published_at: Option<DateTime<Utc>>,
        external_project_id: Option<ExternalProjectId>,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        let plan = state
            .plans
            .get(&id)
            .ok_or(PlanRepositoryError::PlanNotFound(id))?;
        let updated = rebuild_plan(plan, updated_at, |data| {
            data.status = status;
            if published_at.is_some() {
                data.published_at = published_at;
            }
            if external_project_id.is_some() {
                data.external_project_id = external_project_id;
            }
        });
        state.plans.insert(id, updated);
        Ok(())
    }

    async fn update_plan_blocked_by(
        &self,
        id: PlanId,
        blocked_by: &[PlanId],
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        let plan = state
            .plans
            .get(&id)
            .ok_or(PlanRepositoryError::PlanNotFound(id))?;
        let updated = rebuild_plan(plan, updated_at, |data| {
            data.blocked_by_plan_ids = blocked_by.to_vec();
        });
        state.plans.insert(id, updated);
        Ok(())
    }

    async fn delete_plan(&self, id: PlanId) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        if state.plans.remove(&id).is_none() {
            return Err(PlanRepositoryError::PlanNotFound(id));
        }
        let owned = state.plan_tasks.remove(&id).unwrap_or_default();
        for task_id in owned {
            if let Some(task) = state.tasks.remove(&task_id) {
                state.unindex_edges(task_id, task.blocked_by());
            }
            state.dependents.remove(&task_id);
        }
        Ok(())
    }

    async fn find_tasks_by_plan(&self, plan_id: PlanId) -> PlanRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let Some(task_ids) = state.plan_tasks.get(&plan_id) else {
            return Ok(Vec::new());
        };
        Ok(sorted_tasks(
            task_ids.iter().filter_map(|id| state.tasks.get(id)),
        ))
    }

    async fn find_task(&self, id: TaskId) -> PlanRepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn create_task(&self, task: &Task) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        state.check_insertable(task)?;
        state.insert_task(task);
        Ok(())
    }

    async fn create_tasks(&self, tasks: &[Task]) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        let mut batch_ids = HashSet::with_capacity(tasks.len());
        for task in tasks {
            state.check_insertable(task)?;
            if !batch_ids.insert(task.id()) {
                return Err(PlanRepositoryError::DuplicateTask(task.id()));
            }
        }
        for task in tasks {
            state.insert_task(task);
        }
        Ok(())
    }

    async fn update_task_blocked_by(
        &self,
        id: TaskId,
        blocked_by: &[TaskId],
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        let previous = state.task_mut(id)?.blocked_by().to_vec();
        state.unindex_edges(id, &previous);
        state.index_edges(id, blocked_by);
        state
            .task_mut(id)?
            .replace_blocked_by(blocked_by.to_vec(), updated_at);
        Ok(())
    }

    async fn set_task_external_issue(
        &self,
        id: TaskId,
        issue_id: &ExternalIssueId,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        state
            .task_mut(id)?
            .link_external_issue(issue_id.clone(), updated_at);
        Ok(())
    }

    async fn delete_task_cascading(
        &self,
        id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let mut state = self.write()?;
        state.remove_task(id, updated_at)
    }
}
