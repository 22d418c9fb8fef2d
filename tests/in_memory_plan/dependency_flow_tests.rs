//! In-memory integration tests for the task dependency guard.

use std::sync::Arc;

use super::helpers::{
    assert_no_dangling_edges, content, create_plan, dependency_service, repository,
};
use planweave::plan::{
    adapters::memory::InMemoryPlanRepository,
    domain::{BatchTaskSpec, NewTask, PlanDomainError, Task, TaskId},
    ports::PlanRepository,
    services::PlanServiceError,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn chain_built_by_batch_orders_and_rejects_back_edges(
    repository: Arc<InMemoryPlanRepository>,
) -> Result<(), eyre::Report> {
    let plan = create_plan(&repository, "Pipeline").await?;
    let service = dependency_service(&repository);
    let specs = ["Fetch", "Parse", "Index", "Serve"]
        .into_iter()
        .enumerate()
        .map(|(position, title)| {
            let spec = BatchTaskSpec::new(content(title)?);
            Ok(match position.checked_sub(1) {
                Some(previous) => spec.blocked_by([previous]),
                None => spec,
            })
        })
        .collect::<Result<Vec<_>, eyre::Report>>()?;

    let created = service.create_batch(plan.id(), specs).await?;
    let ids: Vec<TaskId> = created.iter().map(Task::id).collect();
    let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
        return Err(eyre::eyre!("batch created no tasks"));
    };

    let back_edge = service.set_blocked_by(*first, vec![*last]).await;
    let Err(PlanServiceError::Domain(PlanDomainError::TaskCycle(path))) = &back_edge else {
        return Err(eyre::eyre!("expected a cycle, got {back_edge:?}"));
    };
    eyre::ensure!(path.nodes().len() == 5, "cycle should pass every task");
    eyre::ensure!(path.nodes().first() == Some(first), "cycle starts at the edited task");
    eyre::ensure!(path.nodes().last() == Some(first), "cycle returns to the edited task");

    let order = service.execution_order(plan.id()).await?;
    let titles: Vec<&str> = order.iter().map(|task| task.content().title()).collect();
    eyre::ensure!(
        titles == ["Fetch", "Parse", "Index", "Serve"],
        "unexpected order {titles:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_cannot_depend_on_tasks_of_other_plans(
    repository: Arc<InMemoryPlanRepository>,
) -> Result<(), eyre::Report> {
    let first_plan = create_plan(&repository, "First").await?;
    let second_plan = create_plan(&repository, "Second").await?;
    let service = dependency_service(&repository);
    let foreign = service
        .create_task(first_plan.id(), NewTask::new(content("Foreign")?, 0))
        .await?;
    let local = service
        .create_task(second_plan.id(), NewTask::new(content("Local")?, 0))
        .await?;

    let result = service.add_dependency(local.id(), foreign.id()).await;

    eyre::ensure!(
        matches!(
            result,
            Err(PlanServiceError::Domain(PlanDomainError::UnknownDependency { .. }))
        ),
        "expected unknown dependency, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_deletes_leave_no_dangling_edges(
    repository: Arc<InMemoryPlanRepository>,
) -> Result<(), eyre::Report> {
    let plan = create_plan(&repository, "Fan-in").await?;
    let service = dependency_service(&repository);
    let mut roots = Vec::new();
    for index in 0..8 {
        let root = service
            .create_task(plan.id(), NewTask::new(content(&format!("Root {index}"))?, index))
            .await?;
        roots.push(root.id());
    }
    let sink = service
        .create_task(
            plan.id(),
            NewTask::new(content("Sink")?, 100).with_blocked_by(roots.clone()),
        )
        .await?;

    let deletions: Vec<_> = roots
        .iter()
        .take(6)
        .map(|root| {
            let worker = dependency_service(&repository);
            let root_id = *root;
            tokio::spawn(async move { worker.delete_task(root_id).await })
        })
        .collect();
    for deletion in deletions {
        deletion.await??;
    }

    assert_no_dangling_edges(&repository, plan.id()).await?;
    let stored = repository
        .find_task(sink.id())
        .await?
        .ok_or_else(|| eyre::eyre!("sink task missing"))?;
    let survivors: Vec<TaskId> = roots.iter().skip(6).copied().collect();
    eyre::ensure!(
        stored.blocked_by() == survivors.as_slice(),
        "sink should keep only surviving blockers"
    );
    Ok(())
}
