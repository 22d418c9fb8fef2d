//! Shared test helpers for in-memory plan integration tests.

use std::collections::HashSet;
use std::sync::Arc;

use mockable::DefaultClock;
use planweave::plan::{
    adapters::memory::InMemoryPlanRepository,
    domain::{NewPlan, Plan, PlanId, ProjectId, TaskContent, TaskId},
    ports::PlanRepository,
    services::{PlanService, TaskDependencyService},
};
use rstest::fixture;

/// Dependency service type used by the integration tests.
pub type TestDependencyService = TaskDependencyService<InMemoryPlanRepository, DefaultClock>;

/// Provides a fresh in-memory repository for each test.
#[fixture]
pub fn repository() -> Arc<InMemoryPlanRepository> {
    Arc::new(InMemoryPlanRepository::new())
}

/// Builds a dependency service over `repository`.
#[must_use]
pub fn dependency_service(repository: &Arc<InMemoryPlanRepository>) -> TestDependencyService {
    TaskDependencyService::new(Arc::clone(repository), Arc::new(DefaultClock))
}

/// Creates a draft plan named `name` in a fresh project.
///
/// # Errors
///
/// Returns an error if the plan cannot be stored.
pub async fn create_plan(
    repository: &Arc<InMemoryPlanRepository>,
    name: &str,
) -> Result<Plan, eyre::Report> {
    let plans = PlanService::new(Arc::clone(repository), Arc::new(DefaultClock));
    Ok(plans
        .create_plan(NewPlan::new(ProjectId::new(), name))
        .await?)
}

/// Builds task content with the given title.
///
/// # Errors
///
/// Returns an error if the title is blank.
pub fn content(title: &str) -> Result<TaskContent, eyre::Report> {
    Ok(TaskContent::new(title)?)
}

/// Asserts that every blocker of every task in `plan_id` is itself a task of
/// that plan.
///
/// # Errors
///
/// Returns an error naming the first dangling edge found.
pub async fn assert_no_dangling_edges(
    repository: &Arc<InMemoryPlanRepository>,
    plan_id: PlanId,
) -> Result<(), eyre::Report> {
    let tasks = repository.find_tasks_by_plan(plan_id).await?;
    let ids: HashSet<TaskId> = tasks.iter().map(|task| task.id()).collect();
    for task in &tasks {
        if let Some(dangling) = task.blocked_by().iter().find(|id| !ids.contains(id)) {
            return Err(eyre::eyre!(
                "task {} still references deleted task {dangling}",
                task.id()
            ));
        }
    }
    Ok(())
}
